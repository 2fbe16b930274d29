//! Search command.
//!
//! ```bash
//! ub-cli search "veg biryani"
//! ```

use unibites_storefront::Storefront;
use unibites_storefront::search::SearchOutcome;

use super::CommandError;

/// Search immediately and print the rendered cards.
#[allow(clippy::print_stdout)]
pub async fn run(shop: &Storefront, query: &str) -> Result<(), CommandError> {
    let search = shop
        .search()
        .ok_or_else(|| CommandError::Rejected("This page has no search panel".to_string()))?;

    match search.submit(query).await {
        SearchOutcome::Rendered { .. } => {
            let Some(rendered) = shop.page().search_results() else {
                return Ok(());
            };
            if rendered.is_placeholder() {
                println!("No results found");
            }
            for card in &rendered.cards {
                println!("{:>8}  {:<32} {}", card.product_id, card.name, card.price);
            }
            Ok(())
        }
        SearchOutcome::TooShort => Err(CommandError::Rejected(format!(
            "Query too short: {:?} (minimum {} characters)",
            query,
            shop.config().search.min_chars
        ))),
        SearchOutcome::Unavailable => Err(CommandError::Rejected(
            "This page has no search panel".to_string(),
        )),
        SearchOutcome::Stale { .. } | SearchOutcome::Failed { .. } => {
            Err(CommandError::Failed("Search"))
        }
    }
}
