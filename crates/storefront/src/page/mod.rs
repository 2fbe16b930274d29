//! In-memory model of the storefront page.
//!
//! The page holds only what the interaction layer reads or writes through the
//! DOM contract points the server-rendered markup exposes (see [`dom`]).
//! Cart rows, the total and the count badge are projections written by the
//! cart controller; the page never derives business state from them.

mod markup;

pub use markup::{Hydration, MarkupError};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use unibites_core::ProductId;

use crate::sequence::Ticket;
use crate::validation::Form;
use crate::view::ResultCard;

/// Stable identifiers shared with the server templates.
pub mod dom {
    /// Meta tag carrying the anti-forgery token.
    pub const CSRF_META: &str = "meta[name=csrf-token]";
    /// Global loading indicator.
    pub const PAGE_LOADER: &str = "#page-loader";
    /// Cart total display.
    pub const CART_TOTAL: &str = "#cart-total";
    /// Cart item count badge.
    pub const CART_COUNT: &str = "#cart-count";
    /// One row per cart line.
    pub const CART_ITEM: &str = ".cart-item";
    /// Quantity input nested in a cart row.
    pub const QUANTITY_INPUT: &str = ".quantity-input";
    /// Search text input.
    pub const SEARCH_INPUT: &str = "#search-input";
    /// Search form.
    pub const SEARCH_FORM: &str = "#search-form";
    /// Search result container.
    pub const SEARCH_RESULTS: &str = "#search-results";
    /// Forms with native constraint validation.
    pub const VALIDATED_FORM: &str = "form.needs-validation";

    /// Element id prefix of a cart row (`cart-item-{id}`).
    pub const CART_ITEM_ID_PREFIX: &str = "cart-item-";
    /// Element id prefix of a quantity input (`quantity-{id}`).
    pub const QUANTITY_ID_PREFIX: &str = "quantity-";
}

/// Contents of the search result container after a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResults {
    /// Query whose response was rendered.
    pub query: String,
    /// Ticket of the dispatch that produced it.
    pub ticket: Ticket,
    /// Cards in display order; empty means the placeholder is shown.
    pub cards: Vec<ResultCard>,
    /// Container markup.
    pub html: String,
}

impl RenderedResults {
    /// Whether the "no results" placeholder is shown.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.cards.is_empty()
    }
}

/// State of a button carrying `data-loading`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingButton {
    pub disabled: bool,
    pub label: String,
}

/// The document the interaction layer operates on.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub(crate) csrf_token: Option<String>,
    pub(crate) has_loader: bool,
    pub(crate) cart_total: Option<String>,
    pub(crate) cart_count: Option<String>,
    pub(crate) cart_rows: BTreeMap<ProductId, String>,
    pub(crate) invalid_quantities: BTreeSet<ProductId>,
    pub(crate) has_search_input: bool,
    pub(crate) has_search_form: bool,
    /// `None` when the container is absent; `Some(None)` before first render.
    pub(crate) search_results: Option<Option<RenderedResults>>,
    pub(crate) forms: BTreeMap<String, Form>,
    pub(crate) loading_buttons: BTreeMap<String, LoadingButton>,
    pub(crate) reload_requests: u32,
}

/// Shared handle to the page document.
#[derive(Clone, Default)]
pub struct Page {
    inner: Arc<Mutex<Document>>,
}

impl Page {
    /// Wrap a document.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(document)),
        }
    }

    /// Start building a page by hand (tests, CLI).
    #[must_use]
    pub fn builder() -> PageBuilder {
        PageBuilder::default()
    }

    /// Hydrate a page and its cart from server-rendered markup.
    ///
    /// # Errors
    ///
    /// Returns `MarkupError` if a contract point carries an unusable value.
    pub fn from_markup(html: &str) -> Result<Hydration, MarkupError> {
        markup::hydrate(html)
    }

    // -------------------------------------------------------------------------
    // Meta / indicator
    // -------------------------------------------------------------------------

    /// Anti-forgery token, or an empty string if the meta tag is absent.
    #[must_use]
    pub fn csrf_token(&self) -> String {
        self.inner.lock().csrf_token.clone().unwrap_or_default()
    }

    /// Replace the anti-forgery token (a fresh token from a new session).
    pub fn set_csrf_token(&self, token: impl Into<String>) {
        self.inner.lock().csrf_token = Some(token.into());
    }

    /// Whether the page renders the global loading indicator.
    #[must_use]
    pub fn has_loader(&self) -> bool {
        self.inner.lock().has_loader
    }

    // -------------------------------------------------------------------------
    // Cart projection
    // -------------------------------------------------------------------------

    /// Text of the cart total element, if present.
    #[must_use]
    pub fn cart_total(&self) -> Option<String> {
        self.inner.lock().cart_total.clone()
    }

    /// Text of the cart count badge, if present.
    #[must_use]
    pub fn cart_count(&self) -> Option<String> {
        self.inner.lock().cart_count.clone()
    }

    /// Value shown in a line's quantity input.
    #[must_use]
    pub fn quantity_input(&self, product_id: &ProductId) -> Option<String> {
        self.inner.lock().cart_rows.get(product_id).cloned()
    }

    /// Product ids of the rendered cart rows.
    #[must_use]
    pub fn cart_rows(&self) -> Vec<ProductId> {
        self.inner.lock().cart_rows.keys().cloned().collect()
    }

    /// Whether a quantity input is flagged invalid.
    #[must_use]
    pub fn is_quantity_flagged(&self, product_id: &ProductId) -> bool {
        self.inner.lock().invalid_quantities.contains(product_id)
    }

    /// Replace every cart row and the total in one step.
    pub(crate) fn project_cart(
        &self,
        rows: impl IntoIterator<Item = (ProductId, u32)>,
        total_text: String,
    ) {
        let mut guard = self.inner.lock();
        let doc = &mut *guard;
        doc.cart_rows = rows
            .into_iter()
            .map(|(id, quantity)| (id, quantity.to_string()))
            .collect();
        doc.invalid_quantities
            .retain(|id| doc.cart_rows.contains_key(id));
        if let Some(total) = doc.cart_total.as_mut() {
            *total = total_text;
        }
    }

    pub(crate) fn set_cart_count(&self, text: String) {
        if let Some(count) = self.inner.lock().cart_count.as_mut() {
            *count = text;
        }
    }

    pub(crate) fn flag_quantity(&self, product_id: &ProductId, invalid: bool) {
        let mut doc = self.inner.lock();
        if invalid {
            doc.invalid_quantities.insert(product_id.clone());
        } else {
            doc.invalid_quantities.remove(product_id);
        }
    }

    // -------------------------------------------------------------------------
    // Search panel
    // -------------------------------------------------------------------------

    /// Whether input, form and result container all exist.
    #[must_use]
    pub fn has_search_panel(&self) -> bool {
        let doc = self.inner.lock();
        doc.has_search_input && doc.has_search_form && doc.search_results.is_some()
    }

    /// Current contents of the result container (`None` before first render).
    #[must_use]
    pub fn search_results(&self) -> Option<RenderedResults> {
        self.inner.lock().search_results.clone().flatten()
    }

    /// Replace the result container contents. Ignored if it is absent.
    pub(crate) fn render_search_results(&self, rendered: RenderedResults) {
        if let Some(slot) = self.inner.lock().search_results.as_mut() {
            *slot = Some(rendered);
        }
    }

    // -------------------------------------------------------------------------
    // Forms / buttons / navigation
    // -------------------------------------------------------------------------

    /// A validated form by id.
    #[must_use]
    pub fn form(&self, form_id: &str) -> Option<Form> {
        self.inner.lock().forms.get(form_id).cloned()
    }

    pub(crate) fn mark_form_validated(&self, form_id: &str) {
        if let Some(form) = self.inner.lock().forms.get_mut(form_id) {
            form.was_validated = true;
        }
    }

    /// State of a `data-loading` button.
    #[must_use]
    pub fn loading_button(&self, button_id: &str) -> Option<LoadingButton> {
        self.inner.lock().loading_buttons.get(button_id).cloned()
    }

    pub(crate) fn set_button_loading(&self, button_id: &str) {
        self.inner.lock().loading_buttons.insert(
            button_id.to_string(),
            LoadingButton {
                disabled: true,
                label: "Loading...".to_string(),
            },
        );
    }

    /// Number of full reloads requested so far.
    #[must_use]
    pub fn reload_requests(&self) -> u32 {
        self.inner.lock().reload_requests
    }

    pub(crate) fn request_reload(&self) {
        self.inner.lock().reload_requests += 1;
        tracing::info!("page reload requested");
    }
}

/// Hand-assembled page for tests and the CLI.
#[derive(Debug, Default)]
pub struct PageBuilder {
    document: Document,
}

impl PageBuilder {
    /// Embed an anti-forgery meta tag.
    #[must_use]
    pub fn csrf_token(mut self, token: impl Into<String>) -> Self {
        self.document.csrf_token = Some(token.into());
        self
    }

    /// Render the global loading indicator.
    #[must_use]
    pub const fn loader(mut self) -> Self {
        self.document.has_loader = true;
        self
    }

    /// Render the cart total and count badge elements.
    #[must_use]
    pub fn cart_widgets(mut self) -> Self {
        self.document.cart_total = Some(String::new());
        self.document.cart_count = Some(String::new());
        self
    }

    /// Render the search input, form and result container.
    #[must_use]
    pub fn search_panel(mut self) -> Self {
        self.document.has_search_input = true;
        self.document.has_search_form = true;
        self.document.search_results = Some(None);
        self
    }

    /// Add a validated form.
    #[must_use]
    pub fn form(mut self, form: Form) -> Self {
        self.document.forms.insert(form.id.clone(), form);
        self
    }

    #[must_use]
    pub fn build(self) -> Page {
        Page::new(self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_is_empty_string() {
        let page = Page::builder().build();
        assert_eq!(page.csrf_token(), "");

        let page = Page::builder().csrf_token("abc").build();
        assert_eq!(page.csrf_token(), "abc");
    }

    #[test]
    fn test_absent_elements_ignore_writes() {
        let page = Page::builder().build();
        page.project_cart([(ProductId::new("1"), 2)], "₹10.00".to_string());
        page.set_cart_count("3".to_string());
        assert_eq!(page.cart_total(), None);
        assert_eq!(page.cart_count(), None);
        assert_eq!(page.quantity_input(&ProductId::new("1")).as_deref(), Some("2"));
    }

    #[test]
    fn test_search_panel_requires_all_parts() {
        assert!(!Page::builder().build().has_search_panel());
        assert!(Page::builder().search_panel().build().has_search_panel());
    }

    #[test]
    fn test_builder_panel_starts_untouched() {
        let page = Page::builder().loader().search_panel().build();
        assert!(page.has_search_panel());
        assert_eq!(page.search_results(), None);
    }

    #[test]
    fn test_loading_button_state() {
        let page = Page::builder().build();
        assert_eq!(page.loading_button("checkout"), None);
        page.set_button_loading("checkout");
        let button = page.loading_button("checkout").unwrap();
        assert!(button.disabled);
        assert_eq!(button.label, "Loading...");
    }
}
