//! `get_order_status`: exact lookup by order id.

use supportdesk_core::entity::Order;
use supportdesk_core::error::StoreError;
use supportdesk_core::store::CatalogStore;
use supportdesk_core::tool::{ToolKind, ToolOutcome};
use tracing::debug;

use crate::format;

pub async fn lookup(catalog: &dyn CatalogStore, order_id: &str) -> Result<ToolOutcome, StoreError> {
    debug!(order_id, "Looking up order status");
    Ok(match catalog.find_order(order_id).await? {
        Some(order) => ToolOutcome::Order(order),
        None => ToolOutcome::NotFound {
            kind: ToolKind::OrderStatus,
            query: order_id.to_string(),
        },
    })
}

/// Customer-facing description of an order.
pub fn render(order: &Order) -> String {
    let mut first = format!("Pesanan {} {}", order.id, order.status.phrase());

    match (&order.carrier, &order.tracking_number) {
        (Some(carrier), Some(tracking)) => {
            first.push_str(&format!(" via {carrier} dengan nomor resi {tracking}"));
        }
        (Some(carrier), None) => first.push_str(&format!(" via {carrier}")),
        _ => {}
    }

    if let Some(eta) = order.eta_date.filter(|_| order.status.shows_eta()) {
        first.push_str(&format!(", dengan estimasi tiba {}", format::date(eta)));
    }

    format!(
        "{first}. Terakhir diupdate: {}.",
        format::datetime(order.last_update_at)
    )
}

pub fn summarize(order: &Order) -> String {
    match (&order.carrier, order.status.shows_eta()) {
        (Some(carrier), true) => format!("Pesanan {} {} via {carrier}.", order.id, order.status.phrase()),
        _ => format!("Pesanan {} {}.", order.id, order.status.phrase()),
    }
}

pub fn not_found(order_id: &str) -> String {
    format!(
        "Pesanan dengan ID {order_id} tidak ditemukan. Pastikan ID pesanan benar atau hubungi customer service."
    )
}

pub fn unavailable(order_id: &str) -> String {
    format!(
        "Maaf, data pesanan {order_id} tidak dapat diambil saat ini. Silakan coba lagi atau hubungi customer service."
    )
}
