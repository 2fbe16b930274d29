//! Order commands.
//!
//! ```bash
//! ub-cli order status 42 preparing
//! ```

use unibites_core::{OrderId, OrderStatus};
use unibites_storefront::Storefront;

use super::CommandError;

/// Move an order to `status`.
pub async fn status(shop: &Storefront, order_id: &OrderId, status: OrderStatus) -> Result<(), CommandError> {
    if shop.update_order_status(order_id, status).await {
        tracing::info!(%order_id, %status, "Order status updated");
        Ok(())
    } else {
        Err(CommandError::Failed("Order status update"))
    }
}
