//! Order status updates from the order management view.

use tracing::instrument;
use unibites_core::{OrderId, OrderStatus};

use crate::remote::{RemoteAction, RemoteActionClient};

/// Move an order to `status`.
///
/// On success the page is asked to reload so the server re-renders the
/// order; failures are notified by the client. Returns whether the server
/// accepted the change.
#[instrument(skip(client), fields(order_id = %order_id, status = %status))]
pub async fn update_order_status(
    client: &RemoteActionClient,
    order_id: &OrderId,
    status: OrderStatus,
) -> bool {
    let result = client
        .execute(&RemoteAction::UpdateOrderStatus {
            order_id: order_id.clone(),
            status,
        })
        .await;

    if result.success {
        client.page().request_reload();
    }
    result.success
}
