//! Cart controller.
//!
//! Quantity changes are applied to [`CartState`] first and projected onto
//! the page before the server confirms them. What happens to the displayed
//! number when the server then fails is decided by the configured
//! [`QuantityFailurePolicy`].

mod state;

pub use state::{CartError, CartLine, CartState};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::instrument;
use unibites_core::{CurrencyCode, ProductId, Severity, format_amount};

use crate::config::QuantityFailurePolicy;
use crate::remote::{RemoteAction, RemoteActionClient};
use crate::sequence::{SequenceTracker, Ticket};

/// Prompt shown before removing a line.
pub const REMOVE_CONFIRMATION: &str = "Are you sure you want to remove this item from cart?";

/// Blocking yes/no prompt.
pub trait ConfirmGate: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmGate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Result of a quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityOutcome {
    /// The typed value is already shown; nothing was sent.
    Unchanged,
    /// The server accepted the new quantity.
    Updated { quantity: u32 },
    /// The server call failed; `shown` is what the line displays now.
    Failed { shown: Option<u32> },
    /// The typed value was rejected locally; nothing was sent.
    Invalid,
    /// The product has no cart line.
    UnknownLine,
}

/// Result of a remove request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The user declined; nothing was sent.
    Cancelled,
    Removed,
    Failed,
}

/// Cart interactions: quantity changes, removal, add and count refresh.
///
/// Cheaply cloneable; clones share the cart aggregate.
#[derive(Clone)]
pub struct CartController {
    inner: Arc<CartInner>,
}

struct CartInner {
    client: RemoteActionClient,
    state: Mutex<CartState>,
    /// Write generation per line; only the latest optimistic write may be
    /// rolled back. Locked after `state`, never before.
    writes: Mutex<HashMap<ProductId, SequenceTracker>>,
    confirm: Arc<dyn ConfirmGate>,
    policy: QuantityFailurePolicy,
    currency: CurrencyCode,
}

impl CartController {
    /// Take ownership of the cart and project it onto the page.
    #[must_use]
    pub fn new(
        client: RemoteActionClient,
        cart: CartState,
        confirm: Arc<dyn ConfirmGate>,
        policy: QuantityFailurePolicy,
        currency: CurrencyCode,
    ) -> Self {
        let controller = Self {
            inner: Arc::new(CartInner {
                client,
                state: Mutex::new(cart),
                writes: Mutex::new(HashMap::new()),
                confirm,
                policy,
                currency,
            }),
        };
        controller.project();
        controller
    }

    /// Snapshot of the cart aggregate.
    #[must_use]
    pub fn cart(&self) -> CartState {
        self.inner.state.lock().clone()
    }

    /// Quantity currently shown for a line.
    #[must_use]
    pub fn quantity(&self, product_id: &ProductId) -> Option<u32> {
        self.inner.state.lock().quantity(product_id)
    }

    // =========================================================================
    // Quantity
    // =========================================================================

    /// Increase (`delta > 0`) or decrease a line, never below 1.
    ///
    /// A decrease at 1 keeps the line at 1 and still confirms that value
    /// with the server.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn change_quantity(&self, product_id: &ProductId, delta: i64) -> QuantityOutcome {
        let write = {
            let mut state = self.inner.state.lock();
            match state.apply_delta(product_id, delta) {
                Ok((previous, current)) => (previous, current, self.issue_write(product_id)),
                Err(e) => {
                    tracing::warn!(error = %e, "quantity change for unknown line");
                    return QuantityOutcome::UnknownLine;
                }
            }
        };

        self.commit_quantity(product_id, write).await
    }

    /// Apply a value typed into a line's quantity input.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn set_quantity(&self, product_id: &ProductId, typed: &str) -> QuantityOutcome {
        let page = self.inner.client.page();
        let Some(quantity) = typed.trim().parse::<u32>().ok().filter(|q| *q >= 1) else {
            if self.quantity(product_id).is_none() {
                return QuantityOutcome::UnknownLine;
            }
            page.flag_quantity(product_id, true);
            self.inner
                .client
                .notifications()
                .notify("Quantity must be at least 1", Severity::Warning);
            return QuantityOutcome::Invalid;
        };

        let write = {
            let mut state = self.inner.state.lock();
            match state.set_quantity(product_id, quantity) {
                Ok(previous) if previous == quantity => None,
                Ok(previous) => Some((previous, quantity, self.issue_write(product_id))),
                Err(e) => {
                    tracing::warn!(error = %e, "quantity input for unknown line");
                    return QuantityOutcome::UnknownLine;
                }
            }
        };
        page.flag_quantity(product_id, false);
        let Some(write) = write else {
            return QuantityOutcome::Unchanged;
        };

        self.commit_quantity(product_id, write).await
    }

    /// Take the write ticket for a line. Call with `state` locked, right
    /// after the optimistic write.
    fn issue_write(&self, product_id: &ProductId) -> Ticket {
        self.inner
            .writes
            .lock()
            .entry(product_id.clone())
            .or_default()
            .issue()
    }

    async fn commit_quantity(
        &self,
        product_id: &ProductId,
        (previous, current, ticket): (u32, u32, Ticket),
    ) -> QuantityOutcome {
        self.project();

        let result = self
            .inner
            .client
            .execute(&RemoteAction::UpdateQuantity {
                product_id: product_id.clone(),
                quantity: current,
            })
            .await;

        if result.success {
            self.inner
                .client
                .notifications()
                .notify("Cart updated successfully!", Severity::Success);
            return QuantityOutcome::Updated { quantity: current };
        }

        if self.inner.policy == QuantityFailurePolicy::Revert {
            let mut state = self.inner.state.lock();
            let latest = self
                .inner
                .writes
                .lock()
                .get(product_id)
                .is_some_and(|writes| writes.is_current(ticket));
            // A newer write to the same line wins over this rollback.
            if latest {
                let _ = state.set_quantity(product_id, previous);
                drop(state);
                tracing::debug!(previous, current, "reverted optimistic quantity");
                self.project();
            }
        }

        QuantityOutcome::Failed {
            shown: self.quantity(product_id),
        }
    }

    // =========================================================================
    // Remove / add / count
    // =========================================================================

    /// Remove a line after the user confirms.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> RemoveOutcome {
        if !self.inner.confirm.confirm(REMOVE_CONFIRMATION) {
            tracing::debug!("removal cancelled");
            return RemoveOutcome::Cancelled;
        }

        let result = self
            .inner
            .client
            .execute(&RemoteAction::RemoveItem {
                product_id: product_id.clone(),
            })
            .await;
        if !result.success {
            return RemoveOutcome::Failed;
        }

        {
            let mut state = self.inner.state.lock();
            state.remove(product_id);
            self.inner.writes.lock().remove(product_id);
        }
        self.project();
        self.refresh_count().await;
        self.inner
            .client
            .notifications()
            .notify("Item removed from cart", Severity::Success);
        RemoveOutcome::Removed
    }

    /// Add a product (from a result card or product page).
    ///
    /// Only the count badge changes; the cart rows come from the server on
    /// the next page load.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: &ProductId, quantity: u32) -> bool {
        let result = self
            .inner
            .client
            .execute(&RemoteAction::AddItem {
                product_id: product_id.clone(),
                quantity: quantity.max(1),
            })
            .await;
        if !result.success {
            return false;
        }

        self.refresh_count().await;
        self.inner
            .client
            .notifications()
            .notify("Item added to cart!", Severity::Success);
        true
    }

    /// Fetch the item count and write it into the badge.
    #[instrument(skip(self))]
    pub async fn refresh_count(&self) -> Option<String> {
        let action = RemoteAction::CartCount;
        let result = self.inner.client.execute(&action).await;
        if !result.success {
            return None;
        }

        let count = match result.field::<Value>("count") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s,
            _ => {
                tracing::error!("cart count response has no usable count");
                self.inner
                    .client
                    .notifications()
                    .notify(action.failure_message(None), Severity::Error);
                return None;
            }
        };

        self.inner.client.page().set_cart_count(count.clone());
        Some(count)
    }

    /// Write every line and the recomputed total onto the page.
    fn project(&self) {
        let (rows, total) = {
            let state = self.inner.state.lock();
            let rows: Vec<_> = state
                .lines()
                .map(|line| (line.product_id.clone(), line.quantity()))
                .collect();
            (rows, state.total())
        };
        self.inner
            .client
            .page()
            .project_cart(rows, format_amount(total, self.inner.currency));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::guard::LoadingGuard;
    use crate::notify::NotificationQueue;
    use crate::page::Page;
    use crate::remote::scripted::ScriptedTransport;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        page: Page,
        cart: CartController,
    }

    impl Harness {
        fn messages(&self) -> Vec<String> {
            self.cart
                .inner
                .client
                .notifications()
                .visible()
                .into_iter()
                .map(|n| n.message)
                .collect()
        }
    }

    fn harness(policy: QuantityFailurePolicy, confirm: Arc<dyn ConfirmGate>) -> Harness {
        let transport = Arc::new(ScriptedTransport::new());
        let page = Page::builder().csrf_token("tok").loader().cart_widgets().build();
        let guard = LoadingGuard::new();
        transport.observe(&guard);
        let client = RemoteActionClient::new(
            transport.clone(),
            guard,
            NotificationQueue::new(Duration::from_secs(5)),
            page.clone(),
        );
        let lines = CartState::from_lines([
            CartLine::new(ProductId::new("1"), 1, Decimal::from(199)).unwrap(),
            CartLine::new(ProductId::new("2"), 2, Decimal::new(4950, 2)).unwrap(),
        ])
        .unwrap();
        let cart = CartController::new(client, lines, confirm, policy, CurrencyCode::INR);
        Harness {
            transport,
            page,
            cart,
        }
    }

    fn always(answer: bool) -> Arc<dyn ConfirmGate> {
        Arc::new(move |_: &str| answer)
    }

    #[tokio::test]
    async fn test_projection_on_construction() {
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, always(true));
        assert_eq!(h.page.cart_total().as_deref(), Some("₹298.00"));
        assert_eq!(h.page.quantity_input(&ProductId::new("2")).as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_increase_updates_optimistically() {
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, always(true));
        h.transport
            .reply("/api/cart/update", json!({ "success": true }));

        let outcome = h.cart.change_quantity(&ProductId::new("1"), 1).await;

        assert_eq!(outcome, QuantityOutcome::Updated { quantity: 2 });
        assert_eq!(h.page.quantity_input(&ProductId::new("1")).as_deref(), Some("2"));
        assert_eq!(h.page.cart_total().as_deref(), Some("₹497.00"));
        let sent = &h.transport.requests()[0];
        assert_eq!(
            sent.request.body,
            Some(json!({ "product_id": "1", "quantity": 2 }))
        );
        assert!(sent.loader_visible);
        assert_eq!(h.messages(), vec!["Cart updated successfully!"]);
    }

    #[tokio::test]
    async fn test_decrease_at_one_stays_at_one() {
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, always(true));
        h.transport
            .reply("/api/cart/update", json!({ "success": true }));

        let outcome = h.cart.change_quantity(&ProductId::new("1"), -1).await;

        assert_eq!(outcome, QuantityOutcome::Updated { quantity: 1 });
        assert_eq!(
            h.transport.requests()[0].request.body,
            Some(json!({ "product_id": "1", "quantity": 1 }))
        );
        assert_eq!(h.page.quantity_input(&ProductId::new("1")).as_deref(), Some("1"));
        assert_eq!(h.page.cart_total().as_deref(), Some("₹298.00"));
        assert_eq!(h.messages(), vec!["Cart updated successfully!"]);
    }

    #[tokio::test]
    async fn test_failure_leaves_optimistic_value_by_default() {
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, always(true));
        h.transport.reply(
            "/api/cart/update",
            json!({ "success": false, "error": "Out of stock" }),
        );

        let outcome = h.cart.change_quantity(&ProductId::new("2"), 1).await;

        assert_eq!(outcome, QuantityOutcome::Failed { shown: Some(3) });
        assert_eq!(h.page.cart_total().as_deref(), Some("₹347.50"));
        assert_eq!(h.messages(), vec!["Error updating cart: Out of stock"]);
    }

    #[tokio::test]
    async fn test_failure_reverts_under_revert_policy() {
        let h = harness(QuantityFailurePolicy::Revert, always(true));
        h.transport.fail("/api/cart/update");

        let outcome = h.cart.change_quantity(&ProductId::new("2"), 1).await;

        assert_eq!(outcome, QuantityOutcome::Failed { shown: Some(2) });
        assert_eq!(h.page.quantity_input(&ProductId::new("2")).as_deref(), Some("2"));
        assert_eq!(h.page.cart_total().as_deref(), Some("₹298.00"));
        assert_eq!(h.messages(), vec!["An error occurred while updating cart"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_keeps_newer_change() {
        let h = harness(QuantityFailurePolicy::Revert, always(true));
        h.transport
            .reply_after(
                "/api/cart/update",
                Duration::from_millis(500),
                json!({ "success": false, "error": "busy" }),
            )
            .reply("/api/cart/update", json!({ "success": true }));

        let first = tokio::spawn({
            let cart = h.cart.clone();
            async move { cart.change_quantity(&ProductId::new("1"), 1).await }
        });
        tokio::task::yield_now().await;
        let second = h.cart.change_quantity(&ProductId::new("1"), 1).await;
        let first = first.await.unwrap();

        assert_eq!(second, QuantityOutcome::Updated { quantity: 3 });
        assert_eq!(first, QuantityOutcome::Failed { shown: Some(3) });
        assert_eq!(h.cart.quantity(&ProductId::new("1")), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_skips_value_confirmed_by_later_writes() {
        let h = harness(QuantityFailurePolicy::Revert, always(true));
        let id = ProductId::new("1");
        h.transport
            .reply_after(
                "/api/cart/update",
                Duration::from_millis(500),
                json!({ "success": false, "error": "busy" }),
            )
            .reply("/api/cart/update", json!({ "success": true }))
            .reply("/api/cart/update", json!({ "success": true }));

        // 1 -> 2, still pending when the next two writes land.
        let pending = tokio::spawn({
            let cart = h.cart.clone();
            let id = id.clone();
            async move { cart.change_quantity(&id, 1).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(
            h.cart.change_quantity(&id, 1).await,
            QuantityOutcome::Updated { quantity: 3 }
        );
        assert_eq!(
            h.cart.change_quantity(&id, -1).await,
            QuantityOutcome::Updated { quantity: 2 }
        );

        // The line shows 2 again, but that 2 was confirmed by the server.
        assert_eq!(
            pending.await.unwrap(),
            QuantityOutcome::Failed { shown: Some(2) }
        );
        assert_eq!(h.cart.quantity(&id), Some(2));
        assert_eq!(h.page.quantity_input(&id).as_deref(), Some("2"));
        assert_eq!(h.page.cart_total().as_deref(), Some("₹497.00"));
    }

    #[tokio::test]
    async fn test_typed_quantity_validation() {
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, always(true));
        let id = ProductId::new("2");

        assert_eq!(h.cart.set_quantity(&id, "0").await, QuantityOutcome::Invalid);
        assert_eq!(h.cart.set_quantity(&id, "two").await, QuantityOutcome::Invalid);
        assert!(h.page.is_quantity_flagged(&id));
        assert!(h.transport.requests().is_empty());
        assert_eq!(h.messages().first().map(String::as_str), Some("Quantity must be at least 1"));

        h.transport
            .reply("/api/cart/update", json!({ "success": true }));
        assert_eq!(
            h.cart.set_quantity(&id, " 5 ").await,
            QuantityOutcome::Updated { quantity: 5 }
        );
        assert!(!h.page.is_quantity_flagged(&id));
        assert_eq!(h.page.cart_total().as_deref(), Some("₹446.50"));
    }

    #[tokio::test]
    async fn test_remove_cancelled_sends_nothing() {
        let asked = Arc::new(AtomicUsize::new(0));
        let gate: Arc<dyn ConfirmGate> = Arc::new({
            let asked = asked.clone();
            move |message: &str| {
                assert_eq!(message, REMOVE_CONFIRMATION);
                asked.fetch_add(1, Ordering::SeqCst);
                false
            }
        });
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, gate);

        assert_eq!(h.cart.remove(&ProductId::new("1")).await, RemoveOutcome::Cancelled);
        assert_eq!(asked.load(Ordering::SeqCst), 1);
        assert!(h.transport.requests().is_empty());
        assert_eq!(h.cart.cart().len(), 2);
        assert_eq!(h.page.cart_total().as_deref(), Some("₹298.00"));
    }

    #[tokio::test]
    async fn test_remove_confirmed() {
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, always(true));
        h.transport
            .reply("/api/cart/remove/1", json!({ "success": true }))
            .reply("/api/cart/count", json!({ "count": 2 }));

        assert_eq!(h.cart.remove(&ProductId::new("1")).await, RemoveOutcome::Removed);

        assert_eq!(h.page.cart_rows(), vec![ProductId::new("2")]);
        assert_eq!(h.page.cart_total().as_deref(), Some("₹99.00"));
        assert_eq!(h.page.cart_count().as_deref(), Some("2"));
        assert_eq!(
            h.transport.paths(),
            vec!["/api/cart/remove/1", "/api/cart/count"]
        );
        assert_eq!(h.messages(), vec!["Item removed from cart"]);
    }

    #[tokio::test]
    async fn test_remove_rejected_keeps_line() {
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, always(true));
        h.transport.reply(
            "/api/cart/remove/2",
            json!({ "success": false, "error": "Order already placed" }),
        );

        assert_eq!(h.cart.remove(&ProductId::new("2")).await, RemoveOutcome::Failed);
        assert_eq!(h.cart.cart().len(), 2);
        assert_eq!(h.messages(), vec!["Error removing item: Order already placed"]);
    }

    #[tokio::test]
    async fn test_add_refreshes_badge_only() {
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, always(true));
        h.transport
            .reply("/api/cart/add", json!({ "success": true }))
            .reply("/api/cart/count", json!({ "count": 4 }));

        assert!(h.cart.add(&ProductId::new("7"), 1).await);

        assert_eq!(h.page.cart_count().as_deref(), Some("4"));
        assert_eq!(h.cart.cart().len(), 2);
        assert_eq!(h.messages(), vec!["Item added to cart!"]);
    }

    #[tokio::test]
    async fn test_count_without_field_notifies() {
        let h = harness(QuantityFailurePolicy::LeaveOptimistic, always(true));
        h.transport.reply("/api/cart/count", json!({}));

        assert_eq!(h.cart.refresh_count().await, None);
        assert_eq!(h.messages(), vec!["An error occurred while refreshing cart count"]);
    }

    #[tokio::test]
    async fn test_indicator_released_after_every_call() {
        let h = harness(QuantityFailurePolicy::Revert, always(true));
        h.transport
            .reply("/api/cart/update", json!({ "success": true }))
            .fail("/api/cart/update");

        h.cart.change_quantity(&ProductId::new("1"), 1).await;
        h.cart.change_quantity(&ProductId::new("1"), 1).await;

        assert!(h.transport.requests().iter().all(|r| r.loader_visible));
        assert!(!h.cart.inner.client.guard().is_visible());
        assert_eq!(h.cart.inner.client.guard().in_flight(), 0);
    }
}
