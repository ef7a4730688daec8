//! Error types for the supportdesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`TurnError`] is what a
//! caller of the turn engine sees.

use thiserror::Error;

/// Errors raised while wiring the engine together, before any turn runs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// The database refused the write because another writer holds the lock.
    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// A reference row the deployment must provide is absent. This is a
    /// configuration problem, not a lookup miss.
    #[error("Policy '{policy_type}' is not configured")]
    PolicyMissing { policy_type: String },
}

/// Everything that can stop a turn from committing.
#[derive(Debug, Clone, Error)]
pub enum TurnError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session '{session_id}' is busy (waited {waited_ms}ms)")]
    SessionBusy { session_id: String, waited_ms: u64 },

    #[error("Policy '{0}' is not configured")]
    PolicyMissing(String),

    #[error("Model did not answer within {after_secs}s")]
    ModelTimeout { after_secs: u64 },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(ProviderError),

    #[error("Storage failure: {0}")]
    Storage(StoreError),
}

impl TurnError {
    /// Whether the client may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SessionBusy { .. } | Self::ModelTimeout { .. } | Self::ModelUnavailable(_) => true,
            Self::Storage(StoreError::Busy(_)) => true,
            Self::InvalidInput(_) | Self::PolicyMissing(_) | Self::Storage(_) => false,
        }
    }

    /// Short machine-readable code for API bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::SessionBusy { .. } => "session_busy",
            Self::PolicyMissing(_) => "policy_missing",
            Self::ModelTimeout { .. } => "model_timeout",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::Storage(_) => "storage_failure",
        }
    }
}

impl From<StoreError> for TurnError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err)
    }
}

impl From<ToolError> for TurnError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::PolicyMissing { policy_type } => Self::PolicyMissing(policy_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err: Error = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        }
        .into();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn store_error_converts_into_setup_error() {
        let err: Error = StoreError::Connection("no such directory".into()).into();
        assert!(matches!(err, Error::Store(StoreError::Connection(_))));
    }

    #[test]
    fn retryable_turn_errors() {
        assert!(TurnError::SessionBusy { session_id: "s".into(), waited_ms: 10 }.is_retryable());
        assert!(TurnError::ModelTimeout { after_secs: 30 }.is_retryable());
        assert!(TurnError::ModelUnavailable(ProviderError::Network("refused".into())).is_retryable());
        assert!(TurnError::Storage(StoreError::Busy("locked".into())).is_retryable());

        assert!(!TurnError::InvalidInput("empty".into()).is_retryable());
        assert!(!TurnError::PolicyMissing("warranty".into()).is_retryable());
        assert!(!TurnError::Storage(StoreError::Query("syntax".into())).is_retryable());
    }

    #[test]
    fn policy_missing_converts_to_turn_error() {
        let err: TurnError = ToolError::PolicyMissing { policy_type: "warranty".into() }.into();
        assert!(matches!(err, TurnError::PolicyMissing(ref t) if t == "warranty"));
        assert_eq!(err.code(), "policy_missing");
    }
}
