//! `get_product_info`: case-insensitive partial match on the product name.

use supportdesk_core::entity::Product;
use supportdesk_core::error::StoreError;
use supportdesk_core::store::CatalogStore;
use supportdesk_core::tool::{ToolKind, ToolOutcome};
use tracing::debug;

use crate::format;

pub async fn lookup(catalog: &dyn CatalogStore, product_name: &str) -> Result<ToolOutcome, StoreError> {
    debug!(product_name, "Looking up product info");
    Ok(match catalog.find_product(product_name).await? {
        Some(product) => ToolOutcome::Product(product),
        None => ToolOutcome::NotFound {
            kind: ToolKind::ProductInfo,
            query: product_name.to_string(),
        },
    })
}

fn stock_phrase(stock: i64) -> String {
    if stock > 0 {
        format!("{stock} unit tersedia")
    } else {
        "sedang kosong".to_string()
    }
}

pub fn render(product: &Product) -> String {
    let mut parts = vec![format!("Produk: {}", product.name)];

    if let Some(features) = product.features.as_deref().filter(|f| !f.trim().is_empty()) {
        parts.push(format!("Fitur: {features}"));
    }
    if let Some(price) = product.price.filter(|p| *p > 0.0) {
        parts.push(format!("Harga: {}", format::rupiah(price)));
    }
    if let Some(stock) = product.stock {
        parts.push(format!("Stok: {}", stock_phrase(stock)));
    }

    parts.join(". ") + "."
}

pub fn summarize(product: &Product) -> String {
    match (product.price.filter(|p| *p > 0.0), product.stock) {
        (Some(price), Some(stock)) => {
            format!("{} seharga {}, stok {}.", product.name, format::rupiah(price), stock_phrase(stock))
        }
        (Some(price), None) => format!("{} seharga {}.", product.name, format::rupiah(price)),
        _ => format!("Informasi {} sudah disampaikan di atas.", product.name),
    }
}

pub fn not_found(product_name: &str) -> String {
    format!(
        "Produk '{product_name}' tidak ditemukan. Silakan periksa nama produk atau lihat katalog lengkap di website kami."
    )
}

pub fn unavailable(product_name: &str) -> String {
    format!("Maaf, informasi produk '{product_name}' tidak dapat diambil saat ini. Silakan coba lagi.")
}
