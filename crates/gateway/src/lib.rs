//! HTTP API gateway for supportdesk.
//!
//! Exposes the turn engine over REST: health, chat, session history and
//! order seeding.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use chrono::{DateTime, Utc};
use supportdesk_agent::TurnOrchestrator;
use supportdesk_config::{AppConfig, GatewayConfig};
use supportdesk_store::SqliteStore;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct AppState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub store: Arc<SqliteStore>,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(orchestrator: Arc<TurnOrchestrator>, store: Arc<SqliteStore>) -> SharedState {
        Arc::new(Self {
            orchestrator,
            store,
            started_at: Utc::now(),
        })
    }
}

/// Build the full router.
///
/// Layers applied:
/// - CORS restricted to the configured origins
/// - Request body size limit (64 KB)
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    api::router(state)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors_layer(&gateway.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Opens the store, builds the provider and the turn engine once, and
/// shares them across requests.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let store = Arc::new(SqliteStore::connect(&config.database.url, config.database.max_connections).await?);

    let providers = supportdesk_providers::build_from_config(&config)?;
    let provider = providers
        .default_provider()
        .ok_or_else(|| format!("Provider '{}' is not configured", config.provider.default_provider))?;

    let orchestrator = Arc::new(TurnOrchestrator::from_config(
        &config,
        provider,
        store.clone(),
        store.clone(),
    )?);

    let app = build_router(AppState::new(orchestrator, store), &config.gateway);

    info!(
        addr = %addr,
        provider = %config.provider.default_provider,
        model = %config.provider.default_model,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
