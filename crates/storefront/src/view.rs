//! Markup fragments rendered by the interaction layer.
//!
//! Everything the server does not render up front (search result cards, the
//! "no results" placeholder, toasts) is produced from these templates.

use askama::Template;
use unibites_core::{CurrencyCode, Price, ProductId};

use crate::notify::Notification;
use crate::search::SearchResult;

/// Image shown for products without one.
pub const DEFAULT_PRODUCT_IMAGE: &str = "/static/images/default-food.jpg";

/// Placeholder text for an empty result set.
pub const NO_RESULTS_MESSAGE: &str = "No results found";

/// Display data for one search result card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCard {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
}

impl ResultCard {
    /// Build the card for a result, pricing it in `currency`.
    #[must_use]
    pub fn new(result: &SearchResult, currency: CurrencyCode) -> Self {
        Self {
            product_id: result.id.clone(),
            name: result.name.clone(),
            description: result.description.clone(),
            price: Price::new(result.price, currency).display_compact(),
            image_url: result
                .image_url
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_PRODUCT_IMAGE.to_string()),
        }
    }

    /// Render the card markup.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render(&self) -> askama::Result<String> {
        ResultCardTemplate {
            product_id: self.product_id.as_str(),
            name: &self.name,
            description: &self.description,
            price: &self.price,
            image_url: &self.image_url,
        }
        .render()
    }
}

/// Search result card fragment.
#[derive(Template)]
#[template(path = "partials/result_card.html")]
struct ResultCardTemplate<'a> {
    product_id: &'a str,
    name: &'a str,
    description: &'a str,
    price: &'a str,
    image_url: &'a str,
}

/// Empty result set placeholder.
#[derive(Template)]
#[template(path = "partials/no_results.html")]
struct NoResultsTemplate<'a> {
    message: &'a str,
}

/// Render the "no results" placeholder.
///
/// # Errors
///
/// Returns an error if template rendering fails.
pub fn render_no_results() -> askama::Result<String> {
    NoResultsTemplate {
        message: NO_RESULTS_MESSAGE,
    }
    .render()
}

/// Toast fragment.
#[derive(Template)]
#[template(path = "partials/toast.html")]
struct ToastTemplate<'a> {
    id: u64,
    style: &'a str,
    icon: &'a str,
    message: &'a str,
}

/// Render a single toast.
///
/// # Errors
///
/// Returns an error if template rendering fails.
pub fn render_toast(notification: &Notification) -> askama::Result<String> {
    ToastTemplate {
        id: notification.id.as_u64(),
        style: notification.severity.style(),
        icon: notification.severity.icon(),
        message: &notification.message,
    }
    .render()
}

/// Render the fixed-position overlay holding `toasts` in stacking order.
///
/// # Errors
///
/// Returns an error if any toast fails to render.
pub fn render_toast_container(toasts: &[Notification]) -> askama::Result<String> {
    let mut html = String::from(
        "<div class=\"toast-container position-fixed top-0 end-0 p-3\" style=\"z-index: 1055;\">",
    );
    for toast in toasts {
        html.push_str(&render_toast(toast)?);
    }
    html.push_str("</div>");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use unibites_core::Severity;

    use super::*;
    use crate::notify::NotificationId;

    fn result(image_url: Option<&str>) -> SearchResult {
        SearchResult {
            id: ProductId::new("3"),
            name: "Paneer <Wrap>".to_string(),
            description: "Grilled paneer".to_string(),
            price: Decimal::new(17_900, 2),
            image_url: image_url.map(str::to_string),
        }
    }

    #[test]
    fn test_card_carries_product_id_attribute() {
        let html = ResultCard::new(&result(None), CurrencyCode::INR)
            .render()
            .unwrap();
        assert!(html.contains("data-product-id=\"3\""));
        assert!(html.contains("₹179"));
        assert!(html.contains(DEFAULT_PRODUCT_IMAGE));
    }

    #[test]
    fn test_card_escapes_names() {
        let html = ResultCard::new(&result(Some("/img/wrap.jpg")), CurrencyCode::INR)
            .render()
            .unwrap();
        assert!(html.contains("Paneer &#60;Wrap&#62;") || html.contains("Paneer &lt;Wrap&gt;"));
        assert!(html.contains("/img/wrap.jpg"));
    }

    #[test]
    fn test_toast_uses_danger_for_errors() {
        let toast = Notification {
            id: NotificationId::new(7),
            message: "Search failed".to_string(),
            severity: Severity::Error,
            created_at: chrono::Utc::now(),
        };
        let html = render_toast(&toast).unwrap();
        assert!(html.contains("bg-danger"));
        assert!(html.contains("fa-exclamation-circle"));
        assert!(html.contains("data-notification-id=\"7\""));
    }

    #[test]
    fn test_no_results_placeholder() {
        assert!(render_no_results().unwrap().contains(NO_RESULTS_MESSAGE));
    }
}
