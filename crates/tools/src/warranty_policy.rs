//! `get_warranty_policy`: the configured warranty policy document.
//!
//! A missing policy row is a deployment problem, not a lookup miss, so the
//! router turns an absent row into `ToolError::PolicyMissing`.

use supportdesk_core::entity::Policy;
use supportdesk_core::error::StoreError;
use supportdesk_core::store::CatalogStore;
use tracing::debug;

pub async fn lookup(catalog: &dyn CatalogStore, policy_type: &str) -> Result<Option<Policy>, StoreError> {
    debug!(policy_type, "Looking up warranty policy");
    catalog.find_policy(policy_type).await
}

pub fn render(policy: &Policy) -> String {
    policy.content_markdown.trim().to_string()
}

pub fn summarize(_policy: &Policy) -> String {
    "Siapkan nota pembelian dan hubungi customer service untuk memulai klaim garansi.".to_string()
}

pub fn unavailable() -> String {
    "Maaf, informasi garansi tidak dapat diambil saat ini. Silakan hubungi customer service di 0800-1234-5678."
        .to_string()
}
