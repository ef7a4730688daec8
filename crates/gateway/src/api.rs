//! REST endpoints.
//!
//! - `GET  /healthz` — liveness plus database reachability
//! - `POST /chat` — run one turn
//! - `GET  /sessions/{session_id}/messages` — committed history
//! - `POST /orders/seed` — upsert orders (demo fixtures when none are given)

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use supportdesk_agent::TurnReply;
use supportdesk_core::entity::{Order, OrderStatus};
use supportdesk_core::error::TurnError;
use supportdesk_store::fixtures::{demo_orders, seed_orders};
use tracing::{error, info};

use crate::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/chat", post(chat))
        .route("/sessions/{session_id}/messages", get(session_messages))
        .route("/orders/seed", post(seed))
        .with_state(state)
}

// --- DTOs ---

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub retryable: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, message: impl Into<String>, retryable: bool) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.to_string(),
            retryable,
        }),
    )
}

fn turn_error(err: TurnError) -> ApiError {
    let status = match &err {
        TurnError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TurnError::SessionBusy { .. } => StatusCode::CONFLICT,
        TurnError::PolicyMissing(_) | TurnError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        TurnError::ModelTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        TurnError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    if status.is_server_error() {
        error!(code = err.code(), error = %err, "Request failed");
    }
    api_error(status, err.code(), err.to_string(), err.is_retryable())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_secs: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub user_message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageDto {
    pub role: String,
    pub content: String,
    pub turn_index: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Deserialize)]
pub struct OrderSeed {
    pub id: String,
    pub user_id: String,
    pub status: String,
    #[serde(default)]
    pub last_update_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub eta_date: Option<NaiveDate>,
    #[serde(default)]
    pub carrier: Option<String>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

impl OrderSeed {
    fn into_order(self) -> Result<Order, String> {
        let status = OrderStatus::parse(&self.status).ok_or_else(|| {
            format!("order {}: unknown status '{}'", self.id, self.status)
        })?;
        if self.id.trim().is_empty() {
            return Err("order id must not be empty".into());
        }
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            status,
            last_update_at: self.last_update_at.unwrap_or_else(Utc::now),
            eta_date: self.eta_date,
            carrier: self.carrier,
            tracking_number: self.tracking_number,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedOrdersRequest {
    #[serde(default)]
    pub orders: Vec<OrderSeed>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedOrdersResponse {
    pub message: String,
    pub order_ids: Vec<String>,
}

// --- Handlers ---

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let database_ok = state.store.ping().await.is_ok();
    let now = Utc::now();
    Json(HealthResponse {
        status: (if database_ok { "ok" } else { "degraded" }).into(),
        database: (if database_ok { "ok" } else { "unavailable" }).into(),
        timestamp: now,
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: (now - state.started_at).num_seconds(),
    })
}

async fn chat(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<TurnReply>, ApiError> {
    let reply = state
        .orchestrator
        .process_message(&payload.session_id, &payload.user_message)
        .await
        .map_err(turn_error)?;
    Ok(Json(reply))
}

async fn session_messages(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state.orchestrator.history(&session_id).await.map_err(turn_error)?;
    let messages = history
        .into_iter()
        .map(|m| MessageDto {
            role: m.role.as_str().to_string(),
            content: m.content,
            turn_index: m.turn_index,
            timestamp: m.created_at,
            tool_calls: m.tool_calls,
        })
        .collect();
    Ok(Json(HistoryResponse { session_id, messages }))
}

async fn seed(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SeedOrdersResponse>), ApiError> {
    // An empty body seeds the demo fixtures.
    let request: SeedOrdersRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SeedOrdersRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_input", e.to_string(), false))?
    };

    let orders = if request.orders.is_empty() {
        demo_orders()
    } else {
        request
            .orders
            .into_iter()
            .map(OrderSeed::into_order)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_input", e, false))?
    };

    let count = seed_orders(&state.store, &orders).await.map_err(|e| {
        error!(error = %e, "Failed to seed orders");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_failure", format!("Failed to seed orders: {e}"), false)
    })?;

    let order_ids: Vec<String> = orders.into_iter().map(|o| o.id).collect();
    info!(count, order_ids = ?order_ids, "Orders seeded");
    Ok((
        StatusCode::CREATED,
        Json(SeedOrdersResponse {
            message: format!("Successfully upserted {count} orders"),
            order_ids,
        }),
    ))
}
