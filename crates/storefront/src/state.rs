//! Storefront wiring.
//!
//! [`Storefront`] owns one instance of every component for a single page
//! and connects them the way the page's markup asks for: the loading
//! indicator is live only if `#page-loader` exists, and search is wired only
//! if the whole search panel is present.

use std::collections::HashMap;
use std::sync::Arc;

use unibites_core::{OrderId, OrderStatus, Severity};

use crate::cart::{CartController, CartState, ConfirmGate};
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::guard::LoadingGuard;
use crate::notify::NotificationQueue;
use crate::orders;
use crate::page::{Hydration, Page};
use crate::remote::{HttpTransport, RemoteActionClient, Transport};
use crate::search::SearchController;
use crate::validation::FormSubmission;

/// Everything the interaction layer needs for one page.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    client: RemoteActionClient,
    cart: CartController,
    search: Option<SearchController>,
}

impl Storefront {
    /// Wire the components for `page` over `transport`.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        page: Page,
        cart: CartState,
        transport: Arc<dyn Transport>,
        confirm: Arc<dyn ConfirmGate>,
    ) -> Self {
        let guard = if page.has_loader() {
            LoadingGuard::new()
        } else {
            LoadingGuard::detached()
        };
        let notifications = NotificationQueue::new(config.toast_duration);
        let client = RemoteActionClient::new(transport, guard, notifications, page.clone());

        let cart = CartController::new(
            client.clone(),
            cart,
            confirm,
            config.quantity_failure_policy,
            config.currency,
        );
        let search = page
            .has_search_panel()
            .then(|| SearchController::new(client.clone(), &config.search, config.currency));

        tracing::debug!(
            lines = cart.cart().len(),
            search = search.is_some(),
            loader = page.has_loader(),
            "storefront wired"
        );

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                client,
                cart,
                search,
            }),
        }
    }

    /// Hydrate server-rendered markup and talk to the configured server.
    ///
    /// # Errors
    ///
    /// Returns an error if the markup carries unusable values or the HTTP
    /// client cannot be built.
    pub fn from_markup(
        config: StorefrontConfig,
        html: &str,
        confirm: Arc<dyn ConfirmGate>,
    ) -> Result<Self> {
        let Hydration { page, cart } = Page::from_markup(html)?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::new(config, page, cart, transport, confirm))
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        self.inner.client.page()
    }

    /// The remote action client shared by every controller.
    #[must_use]
    pub fn client(&self) -> &RemoteActionClient {
        &self.inner.client
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationQueue {
        self.inner.client.notifications()
    }

    #[must_use]
    pub fn loading(&self) -> &LoadingGuard {
        self.inner.client.guard()
    }

    #[must_use]
    pub fn cart(&self) -> &CartController {
        &self.inner.cart
    }

    /// The search controller, if the page has a search panel.
    #[must_use]
    pub fn search(&self) -> Option<&SearchController> {
        self.inner.search.as_ref()
    }

    /// Move an order to a new status; reloads the page on success.
    pub async fn update_order_status(&self, order_id: &OrderId, status: OrderStatus) -> bool {
        orders::update_order_status(&self.inner.client, order_id, status).await
    }

    /// Check a validated form before letting it submit.
    pub fn submit_form(&self, form_id: &str, values: &HashMap<String, String>) -> FormSubmission {
        let page = self.page();
        let Some(form) = page.form(form_id) else {
            return FormSubmission::UnknownForm;
        };

        let violations = form.check_validity(values);
        page.mark_form_validated(form_id);

        let Some(first) = violations.first() else {
            return FormSubmission::Allowed;
        };
        tracing::debug!(form_id, violations = violations.len(), "form submission blocked");
        self.notifications().notify(
            format!("Please correct the highlighted fields: {first}"),
            Severity::Warning,
        );
        FormSubmission::Blocked(violations)
    }
}
