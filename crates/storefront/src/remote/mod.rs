//! Remote action client.
//!
//! Every server call goes through [`RemoteActionClient::execute`]. It shows
//! the loading indicator before sending and always hides it afterwards. Any
//! failure ends up as a notification, so callers only inspect
//! [`ActionResult::success`] to decide what to do next.

mod transport;

#[cfg(test)]
pub(crate) use transport::scripted;
pub use transport::{
    ActionRequest, CSRF_HEADER, HttpTransport, Transport, TransportError, TransportResponse,
};

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::instrument;
use unibites_core::{OrderId, OrderStatus, ProductId, Severity};

use crate::guard::LoadingGuard;
use crate::notify::NotificationQueue;
use crate::page::Page;

/// Error text returned for failures the server never answered.
pub const GENERIC_ERROR: &str = "An error occurred";

// =============================================================================
// Actions
// =============================================================================

/// One server call the page can make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAction {
    UpdateQuantity { product_id: ProductId, quantity: u32 },
    RemoveItem { product_id: ProductId },
    CartCount,
    AddItem { product_id: ProductId, quantity: u32 },
    Search { query: String },
    UpdateOrderStatus { order_id: OrderId, status: OrderStatus },
}

impl RemoteAction {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UpdateQuantity { .. } => "update_quantity",
            Self::RemoveItem { .. } => "remove_item",
            Self::CartCount => "cart_count",
            Self::AddItem { .. } => "add_item",
            Self::Search { .. } => "search",
            Self::UpdateOrderStatus { .. } => "update_order_status",
        }
    }

    #[must_use]
    pub const fn method(&self) -> Method {
        match self {
            Self::UpdateQuantity { .. } | Self::AddItem { .. } => Method::POST,
            Self::RemoveItem { .. } => Method::DELETE,
            Self::CartCount | Self::Search { .. } => Method::GET,
            Self::UpdateOrderStatus { .. } => Method::PUT,
        }
    }

    /// Path and query relative to the server origin.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::UpdateQuantity { .. } => "/api/cart/update".to_string(),
            Self::RemoveItem { product_id } => {
                format!("/api/cart/remove/{}", urlencoding::encode(product_id.as_str()))
            }
            Self::CartCount => "/api/cart/count".to_string(),
            Self::AddItem { .. } => "/api/cart/add".to_string(),
            Self::Search { query } => format!("/api/search?q={}", urlencoding::encode(query)),
            Self::UpdateOrderStatus { order_id, .. } => {
                format!("/api/orders/{}/status", urlencoding::encode(order_id.as_str()))
            }
        }
    }

    /// JSON request body, if the call sends one.
    #[must_use]
    pub fn body(&self) -> Option<Value> {
        match self {
            Self::UpdateQuantity {
                product_id,
                quantity,
            }
            | Self::AddItem {
                product_id,
                quantity,
            } => Some(json!({ "product_id": product_id, "quantity": quantity })),
            Self::UpdateOrderStatus { status, .. } => Some(json!({ "status": status })),
            Self::RemoveItem { .. } | Self::CartCount | Self::Search { .. } => None,
        }
    }

    /// Whether the call changes server state (and needs the token).
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(self, Self::CartCount | Self::Search { .. })
    }

    /// User-facing failure text, with the server's reason when it gave one.
    #[must_use]
    pub fn failure_message(&self, reason: Option<&str>) -> String {
        let (prefix, generic) = match self {
            Self::UpdateQuantity { .. } => (
                "Error updating cart",
                "An error occurred while updating cart",
            ),
            Self::RemoveItem { .. } => (
                "Error removing item",
                "An error occurred while removing item",
            ),
            Self::CartCount => (
                "Error refreshing cart count",
                "An error occurred while refreshing cart count",
            ),
            Self::AddItem { .. } => (
                "Error adding item to cart",
                "An error occurred while adding item to cart",
            ),
            Self::Search { .. } => ("Search failed", "Search failed"),
            Self::UpdateOrderStatus { .. } => (
                "Error updating order status",
                "An error occurred while updating order status",
            ),
        };
        match reason {
            Some(reason) if !reason.is_empty() => format!("{prefix}: {reason}"),
            _ => generic.to_string(),
        }
    }

    fn request(&self, csrf_token: String) -> ActionRequest {
        ActionRequest {
            method: self.method(),
            path: self.path(),
            body: self.body(),
            csrf_token: self.is_mutating().then_some(csrf_token),
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// How a call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// No usable response: network error or unparsable body.
    Transport,
    /// The server answered `success: false`.
    Application,
}

/// Outcome of one remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub success: bool,
    /// Every top-level response field except `success` and `error`.
    pub data: Map<String, Value>,
    pub error: Option<String>,
    failure: Option<Failure>,
}

impl ActionResult {
    /// Interpret a response body.
    ///
    /// Returns `None` if the body is not a JSON object. Bodies without a
    /// `success` field (`{count}`, `{results}`) count as successful.
    #[must_use]
    pub fn from_body(body: &str) -> Option<Self> {
        let Ok(Value::Object(mut data)) = serde_json::from_str::<Value>(body) else {
            return None;
        };

        let success = match data.remove("success") {
            None => true,
            Some(Value::Bool(flag)) => flag,
            Some(_) => false,
        };
        let error = match data.remove("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) => Some(message),
            Some(other) => Some(other.to_string()),
        };

        Some(Self {
            success,
            data,
            error,
            failure: (!success).then_some(Failure::Application),
        })
    }

    /// Result synthesized when no usable response arrived.
    #[must_use]
    pub fn transport_failure() -> Self {
        Self {
            success: false,
            data: Map::new(),
            error: Some(GENERIC_ERROR.to_string()),
            failure: Some(Failure::Transport),
        }
    }

    /// Why the call failed, if it did.
    #[must_use]
    pub const fn failure(&self) -> Option<Failure> {
        self.failure
    }

    /// Decode one field of `data`; `None` if it is missing or malformed.
    #[must_use]
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.data
            .get(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

// =============================================================================
// RemoteActionClient
// =============================================================================

/// Sends actions to the server and reports their failures.
///
/// Cheaply cloneable; clones share the transport, indicator and queue.
#[derive(Clone)]
pub struct RemoteActionClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    guard: LoadingGuard,
    notifications: NotificationQueue,
    page: Page,
}

impl RemoteActionClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        guard: LoadingGuard,
        notifications: NotificationQueue,
        page: Page,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                guard,
                notifications,
                page,
            }),
        }
    }

    #[must_use]
    pub fn guard(&self) -> &LoadingGuard {
        &self.inner.guard
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationQueue {
        &self.inner.notifications
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.inner.page
    }

    /// Perform one action.
    ///
    /// Never fails: transport and application errors are logged, turned
    /// into a notification and returned as an unsuccessful result.
    #[instrument(skip_all, fields(action = action.name()))]
    pub async fn execute(&self, action: &RemoteAction) -> ActionResult {
        let request = action.request(self.inner.page.csrf_token());

        let busy = self.inner.guard.acquire();
        let sent = self.inner.transport.send(request).await;
        drop(busy);

        let result = match sent {
            Ok(response) => ActionResult::from_body(&response.body).unwrap_or_else(|| {
                tracing::error!(
                    status = response.status,
                    body = %response.body.chars().take(200).collect::<String>(),
                    "response body is not a JSON object"
                );
                ActionResult::transport_failure()
            }),
            Err(e) => {
                tracing::error!(error = %e, "remote call failed");
                ActionResult::transport_failure()
            }
        };

        match result.failure {
            Some(Failure::Transport) => {
                self.inner
                    .notifications
                    .notify(action.failure_message(None), Severity::Error);
            }
            Some(Failure::Application) => {
                tracing::warn!(error = ?result.error, "server rejected action");
                self.inner.notifications.notify(
                    action.failure_message(result.error.as_deref()),
                    Severity::Error,
                );
            }
            None => {}
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::scripted::ScriptedTransport;
    use super::*;

    fn client(transport: &Arc<ScriptedTransport>, page: Page) -> RemoteActionClient {
        let guard = LoadingGuard::new();
        transport.observe(&guard);
        RemoteActionClient::new(
            transport.clone(),
            guard,
            NotificationQueue::new(Duration::from_secs(5)),
            page,
        )
    }

    #[test]
    fn test_action_wire_shapes() {
        let update = RemoteAction::UpdateQuantity {
            product_id: ProductId::new("7"),
            quantity: 3,
        };
        assert_eq!(update.method(), Method::POST);
        assert_eq!(update.path(), "/api/cart/update");
        assert_eq!(
            update.body(),
            Some(json!({ "product_id": "7", "quantity": 3 }))
        );

        let remove = RemoteAction::RemoveItem {
            product_id: ProductId::new("7"),
        };
        assert_eq!(remove.method(), Method::DELETE);
        assert_eq!(remove.path(), "/api/cart/remove/7");
        assert_eq!(remove.body(), None);
        assert!(remove.is_mutating());

        let search = RemoteAction::Search {
            query: "paneer tikka & naan".into(),
        };
        assert_eq!(search.path(), "/api/search?q=paneer%20tikka%20%26%20naan");
        assert!(!search.is_mutating());

        let order = RemoteAction::UpdateOrderStatus {
            order_id: OrderId::new("42"),
            status: OrderStatus::OutForDelivery,
        };
        assert_eq!(order.method(), Method::PUT);
        assert_eq!(order.path(), "/api/orders/42/status");
        assert_eq!(order.body(), Some(json!({ "status": "out_for_delivery" })));
    }

    #[test]
    fn test_failure_messages() {
        let update = RemoteAction::UpdateQuantity {
            product_id: ProductId::new("1"),
            quantity: 2,
        };
        assert_eq!(
            update.failure_message(Some("Out of stock")),
            "Error updating cart: Out of stock"
        );
        assert_eq!(
            update.failure_message(None),
            "An error occurred while updating cart"
        );
    }

    #[test]
    fn test_result_parsing() {
        let ok = ActionResult::from_body(r#"{"count": 4}"#).unwrap();
        assert!(ok.success);
        assert_eq!(ok.field::<u32>("count"), Some(4));

        let rejected = ActionResult::from_body(r#"{"success": false, "error": "Nope"}"#).unwrap();
        assert!(!rejected.success);
        assert_eq!(rejected.error.as_deref(), Some("Nope"));
        assert_eq!(rejected.failure(), Some(Failure::Application));
        assert!(rejected.data.is_empty());

        assert!(ActionResult::from_body("<html>500</html>").is_none());
        assert!(ActionResult::from_body("[1, 2]").is_none());
    }

    #[tokio::test]
    async fn test_token_only_on_mutating_calls() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .reply("/api/cart/count", json!({ "count": 1 }))
            .reply("/api/cart/add", json!({ "success": true }));
        let client = client(&transport, Page::builder().csrf_token("tok").build());

        client.execute(&RemoteAction::CartCount).await;
        client
            .execute(&RemoteAction::AddItem {
                product_id: ProductId::new("5"),
                quantity: 1,
            })
            .await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].request.csrf_token, None);
        assert_eq!(requests[1].request.csrf_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_missing_token_sends_empty_string() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply("/api/cart/add", json!({ "success": true }));
        let client = client(&transport, Page::builder().build());

        let result = client
            .execute(&RemoteAction::AddItem {
                product_id: ProductId::new("5"),
                quantity: 1,
            })
            .await;

        assert!(result.success);
        assert_eq!(transport.requests()[0].request.csrf_token.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_indicator_brackets_call() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply("/api/cart/count", json!({ "count": 2 }));
        transport.fail("/api/cart/count");
        let client = client(&transport, Page::builder().loader().build());

        for _ in 0..2 {
            assert!(!client.guard().is_visible());
            client.execute(&RemoteAction::CartCount).await;
            assert!(!client.guard().is_visible());
        }
        assert!(transport.requests().iter().all(|r| r.loader_visible));
    }

    #[tokio::test]
    async fn test_transport_failure_notifies_generic_message() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail("/api/cart/update");
        let client = client(&transport, Page::builder().build());

        let result = client
            .execute(&RemoteAction::UpdateQuantity {
                product_id: ProductId::new("1"),
                quantity: 2,
            })
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(GENERIC_ERROR));
        assert_eq!(result.failure(), Some(Failure::Transport));
        let shown = client.notifications().visible();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].message, "An error occurred while updating cart");
        assert_eq!(shown[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_unparsable_body_is_transport_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply_raw("/api/cart/remove/3", "Internal Server Error");
        let client = client(&transport, Page::builder().build());

        let result = client
            .execute(&RemoteAction::RemoveItem {
                product_id: ProductId::new("3"),
            })
            .await;

        assert_eq!(result.failure(), Some(Failure::Transport));
        assert_eq!(
            client.notifications().visible()[0].message,
            "An error occurred while removing item"
        );
    }

    #[tokio::test]
    async fn test_application_failure_shows_server_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(
            "/api/cart/add",
            json!({ "success": false, "error": "Item unavailable" }),
        );
        let client = client(&transport, Page::builder().build());

        let result = client
            .execute(&RemoteAction::AddItem {
                product_id: ProductId::new("9"),
                quantity: 1,
            })
            .await;

        assert!(!result.success);
        assert_eq!(
            client.notifications().visible()[0].message,
            "Error adding item to cart: Item unavailable"
        );
    }
}
