//! CLI command implementations.

pub mod cart;
pub mod order;
pub mod search;

use std::path::Path;
use std::sync::Arc;

use dialoguer::Confirm;
use thiserror::Error;
use unibites_storefront::Storefront;
use unibites_storefront::cart::{CartState, ConfirmGate};
use unibites_storefront::config::StorefrontConfig;
use unibites_storefront::page::{Hydration, Page};
use unibites_storefront::remote::HttpTransport;

/// Errors that end a command with a non-zero exit status.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The saved page could not be read.
    #[error("Failed to read page {path}: {source}")]
    ReadPage {
        path: String,
        source: std::io::Error,
    },

    /// Setup failed.
    #[error(transparent)]
    Storefront(#[from] unibites_storefront::StorefrontError),

    /// The action ran but did not succeed; details were notified.
    #[error("{0} failed")]
    Failed(&'static str),

    /// The action was rejected before anything was sent.
    #[error("{0}")]
    Rejected(String),
}

impl From<unibites_storefront::page::MarkupError> for CommandError {
    fn from(err: unibites_storefront::page::MarkupError) -> Self {
        Self::Storefront(err.into())
    }
}

impl From<unibites_storefront::remote::TransportError> for CommandError {
    fn from(err: unibites_storefront::remote::TransportError) -> Self {
        Self::Storefront(err.into())
    }
}

/// Build the storefront for one command.
///
/// Without `--page` the command runs against a bare page that has the
/// search panel and cart widgets but no cart lines.
pub async fn open(
    config: StorefrontConfig,
    page_path: Option<&Path>,
    csrf_token: Option<&str>,
    assume_yes: bool,
) -> Result<Storefront, CommandError> {
    let Hydration { page, cart } = match page_path {
        Some(path) => {
            let html = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CommandError::ReadPage {
                    path: path.display().to_string(),
                    source,
                })?;
            Page::from_markup(&html)?
        }
        None => Hydration {
            page: Page::builder().search_panel().cart_widgets().build(),
            cart: CartState::new(),
        },
    };

    if let Some(token) = csrf_token {
        page.set_csrf_token(token);
    }

    let confirm: Arc<dyn ConfirmGate> = if assume_yes {
        Arc::new(|_: &str| true)
    } else {
        Arc::new(|prompt: &str| {
            Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .unwrap_or(false)
        })
    };

    let transport = Arc::new(HttpTransport::new(&config)?);
    tracing::debug!(base_url = %transport.base_url(), "opening storefront");
    Ok(Storefront::new(config, page, cart, transport, confirm))
}

/// Print every notification still on screen, oldest first.
#[allow(clippy::print_stdout)]
pub fn print_notifications(shop: &Storefront) {
    for toast in shop.notifications().visible() {
        println!("[{}] {}", toast.severity, toast.message);
    }
}
