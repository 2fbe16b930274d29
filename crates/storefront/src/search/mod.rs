//! Product search panel.
//!
//! Keystrokes are debounced; a submit dispatches immediately. Every dispatch
//! takes a sequence ticket and only the response to the latest ticket may
//! replace the result container, so a slow early query can never overwrite
//! a newer one.

mod debounce;

pub use debounce::Debouncer;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use unibites_core::{CurrencyCode, ProductId, Severity};

use crate::config::SearchConfig;
use crate::page::RenderedResults;
use crate::remote::{RemoteAction, RemoteActionClient};
use crate::sequence::{SequenceTracker, Ticket};
use crate::view::{self, ResultCard};

/// One product returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// What a dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Below the minimum length; nothing was sent.
    TooShort,
    /// The page has no search panel.
    Unavailable,
    /// Results (or the placeholder) were rendered.
    Rendered { ticket: Ticket, results: usize },
    /// A newer dispatch superseded this one; its response was dropped.
    Stale { ticket: Ticket },
    /// The call or its response failed; the user was notified.
    Failed { ticket: Ticket },
}

/// Debounced, sequence-checked search.
///
/// Cheaply cloneable; clones share the timer and the sequence.
#[derive(Clone)]
pub struct SearchController {
    inner: Arc<SearchInner>,
}

struct SearchInner {
    client: RemoteActionClient,
    tracker: SequenceTracker,
    debouncer: Debouncer,
    min_chars: usize,
    currency: CurrencyCode,
}

impl SearchController {
    #[must_use]
    pub fn new(client: RemoteActionClient, config: &SearchConfig, currency: CurrencyCode) -> Self {
        Self {
            inner: Arc::new(SearchInner {
                client,
                tracker: SequenceTracker::new(),
                debouncer: Debouncer::new(config.debounce),
                min_chars: config.min_chars,
                currency,
            }),
        }
    }

    /// Handle a keystroke: restart the debounce window for `query`.
    pub fn input(&self, query: impl Into<String>) {
        let query = query.into();
        let controller = self.clone();
        self.inner.debouncer.schedule(move || {
            // The ticket is taken when the window closes, so a submit that
            // follows always holds a newer one.
            let claimed = controller.claim(&query);
            async move {
                if let Ok(ticket) = claimed {
                    controller.send(query, ticket).await;
                }
            }
        });
    }

    /// Handle a form submit: drop any pending keystroke and search now.
    pub async fn submit(&self, query: impl Into<String>) -> SearchOutcome {
        self.inner.debouncer.cancel();
        self.dispatch(query.into()).await
    }

    /// Whether a debounced search is waiting to fire.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    /// Latest ticket handed out, if any search was dispatched.
    #[must_use]
    pub fn latest_ticket(&self) -> Option<Ticket> {
        self.inner.tracker.latest()
    }

    /// Send `query` and render the response if it is still the latest.
    pub async fn dispatch(&self, query: String) -> SearchOutcome {
        match self.claim(&query) {
            Ok(ticket) => self.send(query, ticket).await,
            Err(outcome) => outcome,
        }
    }

    /// Check that `query` may be sent and take its ticket.
    fn claim(&self, query: &str) -> Result<Ticket, SearchOutcome> {
        if query.chars().count() < self.inner.min_chars {
            tracing::trace!("query below minimum length");
            return Err(SearchOutcome::TooShort);
        }
        if !self.inner.client.page().has_search_panel() {
            return Err(SearchOutcome::Unavailable);
        }
        Ok(self.inner.tracker.issue())
    }

    #[instrument(skip(self, ticket), fields(sequence = ticket.value()))]
    async fn send(&self, query: String, ticket: Ticket) -> SearchOutcome {
        tracing::debug!("dispatching search");
        let page = self.inner.client.page();

        let action = RemoteAction::Search {
            query: query.clone(),
        };
        let result = self.inner.client.execute(&action).await;
        if !result.success {
            return SearchOutcome::Failed { ticket };
        }

        let Some(results) = result.field::<Vec<SearchResult>>("results") else {
            tracing::error!(sequence = ticket.value(), "search response has no usable results");
            self.inner
                .client
                .notifications()
                .notify(action.failure_message(None), Severity::Error);
            return SearchOutcome::Failed { ticket };
        };

        if !self.inner.tracker.is_current(ticket) {
            tracing::debug!(
                sequence = ticket.value(),
                latest = self.inner.tracker.latest().map(Ticket::value),
                "dropping stale search response"
            );
            return SearchOutcome::Stale { ticket };
        }

        let cards: Vec<ResultCard> = results
            .iter()
            .map(|result| ResultCard::new(result, self.inner.currency))
            .collect();

        let html = match render_container(&cards) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(error = %e, "failed to render search results");
                self.inner
                    .client
                    .notifications()
                    .notify(action.failure_message(None), Severity::Error);
                return SearchOutcome::Failed { ticket };
            }
        };

        page.render_search_results(RenderedResults {
            query,
            ticket,
            cards,
            html,
        });
        SearchOutcome::Rendered {
            ticket,
            results: results.len(),
        }
    }
}

fn render_container(cards: &[ResultCard]) -> askama::Result<String> {
    if cards.is_empty() {
        return view::render_no_results();
    }
    cards.iter().map(ResultCard::render).collect()
}

impl SearchOutcome {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
