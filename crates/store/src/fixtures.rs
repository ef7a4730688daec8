//! Demo reference data for local runs and tests.
//!
//! Seeding is an upsert, so running it twice leaves the same rows behind.

use chrono::{DateTime, NaiveDate, Utc};
use supportdesk_core::entity::{Order, OrderStatus, Policy, Product};
use supportdesk_core::error::StoreError;
use tracing::info;

use crate::sqlite::SqliteStore;

/// Default warranty policy text.
pub const WARRANTY_POLICY_MARKDOWN: &str = "\
Prosedur klaim garansi:
1. Siapkan nota pembelian asli dan kartu garansi
2. Hubungi customer service di 0800-1234-5678 (gratis) atau email cs@toko.com
3. Jelaskan masalah produk dengan detail
4. Tim CS akan memberikan instruksi selanjutnya (perbaikan atau penggantian)
5. Garansi berlaku 1 tahun dari tanggal pembelian untuk kerusakan manufaktur

Catatan: Garansi tidak berlaku untuk kerusakan akibat kesalahan penggunaan atau faktor eksternal.";

/// Counts of rows written by [`seed_demo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub orders: usize,
    pub products: usize,
    pub policies: usize,
}

fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub fn demo_orders() -> Vec<Order> {
    vec![
        Order {
            id: "ORD123".into(),
            user_id: "user123".into(),
            status: OrderStatus::Shipped,
            last_update_at: at("2025-09-16T14:30:00Z"),
            eta_date: NaiveDate::from_ymd_opt(2025, 9, 18),
            carrier: Some("JNE".into()),
            tracking_number: Some("JNE789".into()),
        },
        Order {
            id: "ORD124".into(),
            user_id: "user456".into(),
            status: OrderStatus::Delivered,
            last_update_at: at("2025-09-12T09:15:00Z"),
            eta_date: NaiveDate::from_ymd_opt(2025, 9, 12),
            carrier: Some("SiCepat".into()),
            tracking_number: Some("SCP456123".into()),
        },
        Order {
            id: "ORD125".into(),
            user_id: "user789".into(),
            status: OrderStatus::Pending,
            last_update_at: at("2025-09-17T08:00:00Z"),
            eta_date: None,
            carrier: None,
            tracking_number: None,
        },
        Order {
            id: "ORD126".into(),
            user_id: "user123".into(),
            status: OrderStatus::Confirmed,
            last_update_at: at("2025-09-17T10:45:00Z"),
            eta_date: NaiveDate::from_ymd_opt(2025, 9, 21),
            carrier: Some("J&T".into()),
            tracking_number: Some("JT998877".into()),
        },
        Order {
            id: "ORD127".into(),
            user_id: "user456".into(),
            status: OrderStatus::Cancelled,
            last_update_at: at("2025-09-10T16:20:00Z"),
            eta_date: None,
            carrier: None,
            tracking_number: None,
        },
    ]
}

pub fn demo_products() -> Vec<Product> {
    vec![
        Product {
            id: "P001".into(),
            name: "Laptop Gaming X Pro".into(),
            features: Some(
                "Processor Intel i7-12700H, RAM 16GB DDR4, GPU RTX 4060 8GB, Storage 1TB NVMe SSD, \
                 Display 15.6\" 144Hz"
                    .into(),
            ),
            price: Some(18_500_000.0),
            stock: Some(5),
        },
        Product {
            id: "P002".into(),
            name: "Laptop Ultrabook Y Air".into(),
            features: Some("Processor Intel i5-1335U, RAM 8GB, SSD 512GB, Bobot 1.1kg, Baterai 12 jam".into()),
            price: Some(11_999_000.0),
            stock: Some(0),
        },
        Product {
            id: "P003".into(),
            name: "Smartphone Z Max".into(),
            features: Some("Layar AMOLED 6.7\", Kamera 108MP, Baterai 5000mAh, Pengisian cepat 67W".into()),
            price: Some(6_499_000.0),
            stock: Some(12),
        },
        Product {
            id: "P004".into(),
            name: "Tablet Tab S Lite".into(),
            features: Some("Layar 10.4\", RAM 4GB, Penyimpanan 64GB, Mendukung stylus".into()),
            price: Some(3_799_000.0),
            stock: None,
        },
    ]
}

pub fn warranty_policy() -> Policy {
    let now = Utc::now();
    Policy {
        id: "POL-WARRANTY".into(),
        policy_type: "warranty".into(),
        content_markdown: WARRANTY_POLICY_MARKDOWN.into(),
        created_at: now,
        updated_at: now,
    }
}

/// Upsert every demo order.
pub async fn seed_orders(store: &SqliteStore, orders: &[Order]) -> Result<usize, StoreError> {
    for order in orders {
        store.upsert_order(order).await?;
    }
    Ok(orders.len())
}

/// Upsert demo orders, products and the warranty policy.
pub async fn seed_demo(store: &SqliteStore) -> Result<SeedReport, StoreError> {
    let orders = seed_orders(store, &demo_orders()).await?;

    let products = demo_products();
    for product in &products {
        store.upsert_product(product).await?;
    }

    store.upsert_policy(&warranty_policy()).await?;

    let report = SeedReport {
        orders,
        products: products.len(),
        policies: 1,
    };
    info!(orders = report.orders, products = report.products, "Seeded demo data");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use supportdesk_core::store::CatalogStore;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("seed.db"), 2).await.unwrap();

        let first = seed_demo(&store).await.unwrap();
        let second = seed_demo(&store).await.unwrap();
        assert_eq!(first, second);

        assert_eq!(store.product_names().await.unwrap().len(), demo_products().len());
        let order = store.find_order("ORD123").await.unwrap().unwrap();
        assert_eq!(order.carrier.as_deref(), Some("JNE"));
        assert_eq!(order.status, OrderStatus::Shipped);
        assert!(store.find_policy("warranty").await.unwrap().is_some());
    }

    #[test]
    fn demo_order_ids_use_default_prefix() {
        assert!(demo_orders().iter().all(|o| o.id.starts_with("ORD")));
    }
}
