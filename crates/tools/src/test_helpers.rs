//! In-memory catalogs for tool tests.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use supportdesk_core::entity::{Order, OrderStatus, Policy, Product};
use supportdesk_core::error::StoreError;
use supportdesk_core::store::CatalogStore;

pub fn sample_order(status: OrderStatus) -> Order {
    Order {
        id: "ORD123".into(),
        user_id: "user123".into(),
        status,
        last_update_at: Utc.with_ymd_and_hms(2025, 9, 16, 14, 30, 0).unwrap(),
        eta_date: NaiveDate::from_ymd_opt(2025, 9, 18),
        carrier: Some("JNE".into()),
        tracking_number: Some("JNE789".into()),
    }
}

pub fn sample_product() -> Product {
    Product {
        id: "P001".into(),
        name: "Laptop Gaming X Pro".into(),
        features: Some("RAM 16GB, RTX 4060".into()),
        price: Some(18_500_000.0),
        stock: Some(5),
    }
}

/// Fixed catalog with the same matching rules as the SQLite store.
pub struct StaticCatalog {
    orders: Vec<Order>,
    products: Vec<Product>,
    policies: Vec<Policy>,
}

impl StaticCatalog {
    pub fn demo() -> Self {
        Self {
            orders: vec![sample_order(OrderStatus::Shipped)],
            products: vec![sample_product()],
            policies: vec![Policy {
                id: "pol-1".into(),
                policy_type: "warranty".into(),
                content_markdown: "Prosedur klaim garansi:\n1. Siapkan nota pembelian".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }],
        }
    }

    pub fn without_policies(mut self) -> Self {
        self.policies.clear();
        self
    }
}

#[async_trait]
impl CatalogStore for StaticCatalog {
    async fn find_order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.iter().find(|o| o.id == order_id).cloned())
    }

    async fn find_product(&self, name_fragment: &str) -> Result<Option<Product>, StoreError> {
        let needle = name_fragment.to_lowercase();
        Ok(self.products.iter().find(|p| p.name.to_lowercase().contains(&needle)).cloned())
    }

    async fn find_policy(&self, policy_type: &str) -> Result<Option<Policy>, StoreError> {
        Ok(self.policies.iter().find(|p| p.policy_type == policy_type).cloned())
    }

    async fn product_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.products.iter().map(|p| p.name.clone()).collect())
    }
}

/// Never answers.
pub struct HangingCatalog;

#[async_trait]
impl CatalogStore for HangingCatalog {
    async fn find_order(&self, _order_id: &str) -> Result<Option<Order>, StoreError> {
        std::future::pending().await
    }

    async fn find_product(&self, _name_fragment: &str) -> Result<Option<Product>, StoreError> {
        std::future::pending().await
    }

    async fn find_policy(&self, _policy_type: &str) -> Result<Option<Policy>, StoreError> {
        std::future::pending().await
    }

    async fn product_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }
}

/// Fails every query.
pub struct FailingCatalog;

#[async_trait]
impl CatalogStore for FailingCatalog {
    async fn find_order(&self, _order_id: &str) -> Result<Option<Order>, StoreError> {
        Err(StoreError::Query("disk I/O error".into()))
    }

    async fn find_product(&self, _name_fragment: &str) -> Result<Option<Product>, StoreError> {
        Err(StoreError::Query("disk I/O error".into()))
    }

    async fn find_policy(&self, _policy_type: &str) -> Result<Option<Policy>, StoreError> {
        Err(StoreError::Query("disk I/O error".into()))
    }

    async fn product_names(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Query("disk I/O error".into()))
    }
}
