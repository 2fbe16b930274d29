//! Delegated page events.
//!
//! The page reports what the user did as a [`UiEvent`]; elements are
//! identified by their classes and `data-*` attributes, never by handlers
//! attached to individual nodes. Result cards rendered after load therefore
//! work without any extra wiring.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use unibites_core::ProductId;

use crate::cart::{QuantityOutcome, RemoveOutcome};
use crate::notify::NotificationId;
use crate::search::SearchOutcome;
use crate::state::Storefront;
use crate::validation::FormSubmission;
use crate::view::ResultCard;

/// The element a click landed on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    pub id: Option<String>,
    pub classes: BTreeSet<String>,
    /// `data-*` attributes without the prefix (`product-id`, `action`, ...).
    pub data: BTreeMap<String, String>,
}

impl ClickTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    #[must_use]
    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    fn product_id(&self) -> Option<ProductId> {
        self.attr("product-id")
            .filter(|id| !id.is_empty())
            .map(ProductId::new)
    }
}

impl From<&ResultCard> for ClickTarget {
    /// The card's "Add" button.
    fn from(card: &ResultCard) -> Self {
        Self::new()
            .class("add-to-cart-btn")
            .data("product-id", card.product_id.as_str())
    }
}

/// Something the user did on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Click(ClickTarget),
    /// A value typed into a cart line's quantity input.
    QuantityInput { product_id: ProductId, value: String },
    SearchInput(String),
    SearchSubmit(String),
    FormSubmit {
        form_id: String,
        values: HashMap<String, String>,
    },
    DismissNotification(NotificationId),
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Quantity(QuantityOutcome),
    Remove(RemoveOutcome),
    Added(bool),
    /// A debounced search was (re)scheduled.
    SearchScheduled,
    Search(SearchOutcome),
    Form(FormSubmission),
    /// A `data-loading` button switched to its loading state.
    ButtonLoading,
    Dismissed(bool),
    /// Nothing on the page handles this event.
    Ignored,
}

impl Storefront {
    /// Route a page event to the component that handles it.
    pub async fn dispatch(&self, event: UiEvent) -> EventOutcome {
        match event {
            UiEvent::Click(target) => self.click(&target).await,
            UiEvent::QuantityInput { product_id, value } => {
                EventOutcome::Quantity(self.cart().set_quantity(&product_id, &value).await)
            }
            UiEvent::SearchInput(query) => match self.search() {
                Some(search) => {
                    search.input(query);
                    EventOutcome::SearchScheduled
                }
                None => EventOutcome::Ignored,
            },
            UiEvent::SearchSubmit(query) => match self.search() {
                Some(search) => EventOutcome::Search(search.submit(query).await),
                None => EventOutcome::Ignored,
            },
            UiEvent::FormSubmit { form_id, values } => {
                EventOutcome::Form(self.submit_form(&form_id, &values))
            }
            UiEvent::DismissNotification(id) => {
                EventOutcome::Dismissed(self.notifications().dismiss(id))
            }
        }
    }

    async fn click(&self, target: &ClickTarget) -> EventOutcome {
        let loading = target.attr("loading").is_some();
        if loading && let Some(id) = &target.id {
            self.page().set_button_loading(id);
        }

        let handled = if target.has_class("quantity-btn") {
            let delta = match target.attr("action") {
                Some("increase") => Some(1),
                Some("decrease") => Some(-1),
                _ => None,
            };
            match (target.product_id(), delta) {
                (Some(product_id), Some(delta)) => Some(EventOutcome::Quantity(
                    self.cart().change_quantity(&product_id, delta).await,
                )),
                _ => None,
            }
        } else if target.has_class("remove-item") {
            match target.product_id() {
                Some(product_id) => Some(EventOutcome::Remove(
                    self.cart().remove(&product_id).await,
                )),
                None => None,
            }
        } else if target.has_class("add-to-cart-btn") {
            let quantity = target
                .attr("quantity")
                .and_then(|q| q.parse::<u32>().ok())
                .unwrap_or(1);
            match target.product_id() {
                Some(product_id) => Some(EventOutcome::Added(
                    self.cart().add(&product_id, quantity).await,
                )),
                None => None,
            }
        } else {
            None
        };

        handled.unwrap_or_else(|| {
            if loading {
                EventOutcome::ButtonLoading
            } else {
                tracing::trace!(?target, "click not handled");
                EventOutcome::Ignored
            }
        })
    }
}
