//! Deterministic lookups for supportdesk.
//!
//! Three read-only tools, one per intent:
//! - [`order_status`] — `get_order_status(order_id)`
//! - [`product_info`] — `get_product_info(product_name)`
//! - [`warranty_policy`] — `get_warranty_policy()`
//!
//! [`ToolRouter`] runs exactly the tool an intent implies, bounded by a
//! per-lookup deadline, and [`describe`] / [`summarize`] turn any outcome
//! into reply text.

pub mod format;
pub mod order_status;
pub mod product_info;
pub mod warranty_policy;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use supportdesk_core::error::{StoreError, ToolError};
use supportdesk_core::intent::Intent;
use supportdesk_core::provider::ToolDefinition;
use supportdesk_core::store::CatalogStore;
use supportdesk_core::tool::{ToolInvocation, ToolKind, ToolOutcome};
use tracing::{info, warn};

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(2000);

/// Dispatches an intent to its lookup.
pub struct ToolRouter {
    catalog: Arc<dyn CatalogStore>,
    timeout: Duration,
    warranty_policy_type: String,
}

impl ToolRouter {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
            warranty_policy_type: "warranty".into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_warranty_policy_type(mut self, policy_type: impl Into<String>) -> Self {
        self.warranty_policy_type = policy_type.into();
        self
    }

    /// Tool schema offered to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolKind::definitions()
    }

    /// Run the tool implied by `intent`, at most once.
    ///
    /// Returns `Ok(None)` for [`Intent::None`]. Misses, timeouts and store
    /// failures come back as outcomes; only a missing policy is an error.
    pub async fn dispatch(&self, intent: &Intent) -> Result<Option<ToolInvocation>, ToolError> {
        let Some(kind) = intent.tool_kind() else {
            return Ok(None);
        };
        let query = intent.parameter().to_string();
        let started = Instant::now();

        let result = tokio::time::timeout(self.timeout, self.run(intent)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(Ok(Some(outcome))) => outcome,
            Ok(Ok(None)) => {
                warn!(tool = kind.name(), policy_type = %self.warranty_policy_type, "Policy row missing");
                return Err(ToolError::PolicyMissing {
                    policy_type: self.warranty_policy_type.clone(),
                });
            }
            Ok(Err(err)) => {
                warn!(tool = kind.name(), query = %query, elapsed_ms, error = %err, "Lookup failed");
                ToolOutcome::Failed { kind, query: query.clone(), reason: err.to_string() }
            }
            Err(_) => {
                let after_ms = self.timeout.as_millis() as u64;
                warn!(tool = kind.name(), query = %query, after_ms, "Lookup timed out");
                ToolOutcome::TimedOut { kind, query: query.clone(), after_ms }
            }
        };

        info!(tool = kind.name(), found = outcome.is_found(), elapsed_ms, "Tool executed");
        Ok(Some(ToolInvocation { kind, input: query, outcome, elapsed_ms }))
    }

    /// `Ok(None)` only when the warranty policy row is absent.
    async fn run(&self, intent: &Intent) -> Result<Option<ToolOutcome>, StoreError> {
        let catalog = self.catalog.as_ref();
        match intent {
            Intent::OrderStatus(order_id) => order_status::lookup(catalog, order_id).await.map(Some),
            Intent::ProductInfo(name) => product_info::lookup(catalog, name).await.map(Some),
            Intent::WarrantyPolicy => Ok(warranty_policy::lookup(catalog, &self.warranty_policy_type)
                .await?
                .map(ToolOutcome::Warranty)),
            Intent::None => Ok(None),
        }
    }
}

/// Reply text for an outcome. Misses and failures say so plainly.
pub fn describe(outcome: &ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Order(order) => order_status::render(order),
        ToolOutcome::Product(product) => product_info::render(product),
        ToolOutcome::Warranty(policy) => warranty_policy::render(policy),
        ToolOutcome::NotFound { kind, query } => match kind {
            ToolKind::OrderStatus => order_status::not_found(query),
            ToolKind::ProductInfo => product_info::not_found(query),
            ToolKind::WarrantyPolicy => warranty_policy::unavailable(),
        },
        ToolOutcome::TimedOut { kind, query, .. } | ToolOutcome::Failed { kind, query, .. } => match kind {
            ToolKind::OrderStatus => order_status::unavailable(query),
            ToolKind::ProductInfo => product_info::unavailable(query),
            ToolKind::WarrantyPolicy => warranty_policy::unavailable(),
        },
    }
}

/// One-sentence summary of an outcome, without the summary prefix.
pub fn summarize(outcome: &ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Order(order) => order_status::summarize(order),
        ToolOutcome::Product(product) => product_info::summarize(product),
        ToolOutcome::Warranty(policy) => warranty_policy::summarize(policy),
        ToolOutcome::NotFound { kind: ToolKind::OrderStatus, query } => {
            format!("Pesanan {query} tidak ditemukan, mohon periksa kembali ID pesanan.")
        }
        ToolOutcome::NotFound { kind: ToolKind::ProductInfo, query } => {
            format!("Produk '{query}' tidak ditemukan di katalog kami.")
        }
        ToolOutcome::NotFound { kind: ToolKind::WarrantyPolicy, .. }
        | ToolOutcome::TimedOut { .. }
        | ToolOutcome::Failed { .. } => "Data belum dapat diambil, silakan coba lagi sebentar lagi.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingCatalog, HangingCatalog, StaticCatalog};

    fn router(catalog: impl CatalogStore + 'static) -> ToolRouter {
        ToolRouter::new(Arc::new(catalog))
    }

    #[tokio::test]
    async fn none_intent_runs_nothing() {
        let result = router(StaticCatalog::demo()).dispatch(&Intent::None).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn order_intent_runs_order_lookup() {
        let invocation = router(StaticCatalog::demo())
            .dispatch(&Intent::OrderStatus("ORD123".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invocation.kind, ToolKind::OrderStatus);
        assert_eq!(invocation.input, "ORD123");
        assert!(describe(&invocation.outcome).contains("JNE"));
    }

    #[tokio::test]
    async fn missing_order_is_absorbed() {
        let invocation = router(StaticCatalog::demo())
            .dispatch(&Intent::OrderStatus("ORD999".into()))
            .await
            .unwrap()
            .unwrap();
        assert!(!invocation.outcome.is_found());
        let text = describe(&invocation.outcome);
        assert!(text.contains("ORD999"));
        assert!(text.contains("tidak ditemukan"));
    }

    #[tokio::test]
    async fn missing_policy_is_an_error() {
        let err = router(StaticCatalog::demo().without_policies())
            .dispatch(&Intent::WarrantyPolicy)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PolicyMissing { ref policy_type } if policy_type == "warranty"));
    }

    #[tokio::test]
    async fn custom_policy_type_is_used() {
        let result = router(StaticCatalog::demo())
            .with_warranty_policy_type("garansi-elektronik")
            .dispatch(&Intent::WarrantyPolicy)
            .await;
        assert!(matches!(result, Err(ToolError::PolicyMissing { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookup_times_out() {
        let invocation = router(HangingCatalog)
            .with_timeout(Duration::from_millis(50))
            .dispatch(&Intent::ProductInfo("Laptop Gaming X Pro".into()))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            invocation.outcome,
            ToolOutcome::TimedOut { kind: ToolKind::ProductInfo, after_ms: 50, .. }
        ));
        assert!(describe(&invocation.outcome).contains("tidak dapat diambil"));
    }

    #[tokio::test]
    async fn store_failure_becomes_failed_outcome() {
        let invocation = router(FailingCatalog)
            .dispatch(&Intent::OrderStatus("ORD123".into()))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(invocation.outcome, ToolOutcome::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_warranty_lookup_times_out_instead_of_erroring() {
        let result = router(HangingCatalog)
            .with_timeout(Duration::from_millis(10))
            .dispatch(&Intent::WarrantyPolicy)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result.outcome, ToolOutcome::TimedOut { .. }));
    }

    #[test]
    fn summaries_never_claim_found_for_misses() {
        let miss = ToolOutcome::NotFound { kind: ToolKind::OrderStatus, query: "ORD9".into() };
        assert!(summarize(&miss).contains("tidak ditemukan"));
    }

    #[test]
    fn definitions_cover_all_tools() {
        let names: Vec<String> = router(StaticCatalog::demo()).definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["get_order_status", "get_product_info", "get_warranty_policy"]);
    }
}
