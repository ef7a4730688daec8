pub mod chat;
pub mod doctor;
pub mod history;
pub mod init;
pub mod seed;
pub mod serve;

use std::path::Path;
use std::sync::Arc;

use supportdesk_agent::TurnOrchestrator;
use supportdesk_config::AppConfig;
use supportdesk_core::error::{Error, ProviderError};
use supportdesk_store::SqliteStore;

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

pub async fn open_store(config: &AppConfig) -> Result<Arc<SqliteStore>, Error> {
    let store = SqliteStore::connect(&config.database.url, config.database.max_connections).await?;
    Ok(Arc::new(store))
}

/// Build the turn engine over the configured provider and `store`.
pub fn build_engine(config: &AppConfig, store: &Arc<SqliteStore>) -> Result<TurnOrchestrator, Error> {
    let providers = supportdesk_providers::build_from_config(config)?;
    let provider = providers.default_provider().ok_or_else(|| {
        ProviderError::NotConfigured(format!("Provider '{}' is not configured", config.provider.default_provider))
    })?;
    TurnOrchestrator::from_config(config, provider, store.clone(), store.clone())
}
