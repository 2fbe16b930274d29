//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! ub-cli cart add 12 -q 2
//! ub-cli --page cart.html cart update 12 3
//! ub-cli --page cart.html cart remove 12 --yes
//! ub-cli cart count
//! ```
//!
//! `update` and `remove` work on the lines of the page given with `--page`;
//! without one, `update` sends the quantity as-is.

use unibites_core::ProductId;
use unibites_storefront::Storefront;
use unibites_storefront::cart::{QuantityOutcome, RemoveOutcome};
use unibites_storefront::remote::RemoteAction;

use super::CommandError;

/// Add a product.
pub async fn add(shop: &Storefront, product_id: &ProductId, quantity: u32) -> Result<(), CommandError> {
    if shop.cart().add(product_id, quantity).await {
        print_count(shop);
        Ok(())
    } else {
        Err(CommandError::Failed("Add to cart"))
    }
}

/// Set a line's quantity.
pub async fn update(shop: &Storefront, product_id: &ProductId, quantity: &str) -> Result<(), CommandError> {
    if shop.cart().quantity(product_id).is_none() {
        return update_unhydrated(shop, product_id, quantity).await;
    }

    match shop.cart().set_quantity(product_id, quantity).await {
        QuantityOutcome::Updated { .. } | QuantityOutcome::Unchanged => {
            print_total(shop);
            Ok(())
        }
        QuantityOutcome::Invalid => Err(CommandError::Rejected(format!(
            "Invalid quantity: {quantity}"
        ))),
        QuantityOutcome::Failed { .. } => Err(CommandError::Failed("Cart update")),
        QuantityOutcome::UnknownLine => Err(CommandError::Rejected(format!(
            "Product {product_id} is not in the cart"
        ))),
    }
}

// No page lines to update optimistically: just tell the server.
async fn update_unhydrated(
    shop: &Storefront,
    product_id: &ProductId,
    quantity: &str,
) -> Result<(), CommandError> {
    let quantity = quantity
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| CommandError::Rejected(format!("Invalid quantity: {quantity}")))?;

    let result = shop
        .client()
        .execute(&RemoteAction::UpdateQuantity {
            product_id: product_id.clone(),
            quantity,
        })
        .await;
    if result.success {
        Ok(())
    } else {
        Err(CommandError::Failed("Cart update"))
    }
}

/// Remove a line after confirmation.
pub async fn remove(shop: &Storefront, product_id: &ProductId) -> Result<(), CommandError> {
    match shop.cart().remove(product_id).await {
        RemoveOutcome::Removed => {
            print_total(shop);
            print_count(shop);
            Ok(())
        }
        RemoveOutcome::Cancelled => {
            tracing::info!("Removal cancelled");
            Ok(())
        }
        RemoveOutcome::Failed => Err(CommandError::Failed("Remove item")),
    }
}

/// Print the cart item count.
pub async fn count(shop: &Storefront) -> Result<(), CommandError> {
    shop.cart()
        .refresh_count()
        .await
        .map(|_| print_count(shop))
        .ok_or(CommandError::Failed("Cart count"))
}

#[allow(clippy::print_stdout)]
fn print_count(shop: &Storefront) {
    if let Some(count) = shop.page().cart_count() {
        println!("Items in cart: {count}");
    }
}

#[allow(clippy::print_stdout)]
fn print_total(shop: &Storefront) {
    if let Some(total) = shop.page().cart_total()
        && !total.is_empty()
    {
        println!("Cart total: {total}");
    }
}
