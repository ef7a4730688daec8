//! Turn orchestration.
//!
//! One call to [`TurnOrchestrator::process_message`] is one turn:
//! take the session, read the memory window, classify the message, run at
//! most one lookup, ask the model, compose the reply and commit both sides
//! under the next index. Any failure before the commit aborts the turn and
//! leaves the session untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use supportdesk_config::AppConfig;
use supportdesk_core::error::{Error, ProviderError, TurnError};
use supportdesk_core::intent::Intent;
use supportdesk_core::message::{Message, StoredMessage};
use supportdesk_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
use supportdesk_core::store::{CatalogStore, MessageLog};
use supportdesk_core::tool::ToolInvocation;
use supportdesk_tools::ToolRouter;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::composer::ResponseComposer;
use crate::intent::IntentExtractor;
use crate::memory_window::MemoryWindow;
use crate::prompt;
use crate::sequencer::{TurnHandle, TurnSequencer};

pub const MAX_SESSION_ID_CHARS: usize = 255;
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// The reply to one committed turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub message: String,
    pub session_id: String,
    pub turn_index: u32,
    pub tool_calls: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Model and retry knobs for a turn.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub model_timeout: Duration,
    pub busy_retries: u32,
    pub busy_backoff: Duration,
}

impl TurnSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.provider.default_model.clone(),
            temperature: config.provider.temperature,
            max_tokens: Some(config.provider.max_tokens),
            model_timeout: Duration::from_secs(config.timeouts.model_secs),
            busy_retries: config.timeouts.busy_retries,
            busy_backoff: Duration::from_millis(200),
        }
    }
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Text and tool names of a turn that is ready to commit.
struct Drafted {
    text: String,
    tool_calls: Vec<String>,
}

pub struct TurnOrchestrator {
    provider: Arc<dyn Provider>,
    catalog: Arc<dyn CatalogStore>,
    sequencer: TurnSequencer,
    memory: MemoryWindow,
    extractor: IntentExtractor,
    router: ToolRouter,
    composer: ResponseComposer,
    settings: TurnSettings,
}

impl TurnOrchestrator {
    /// Build an orchestrator with default configuration.
    pub fn new(
        provider: Arc<dyn Provider>,
        catalog: Arc<dyn CatalogStore>,
        log: Arc<dyn MessageLog>,
    ) -> Result<Self, Error> {
        Self::from_config(&AppConfig::default(), provider, catalog, log)
    }

    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        catalog: Arc<dyn CatalogStore>,
        log: Arc<dyn MessageLog>,
    ) -> Result<Self, Error> {
        let router = ToolRouter::new(catalog.clone())
            .with_timeout(Duration::from_millis(config.timeouts.tool_ms))
            .with_warranty_policy_type(&config.intents.warranty_policy_type);

        Ok(Self {
            provider,
            catalog,
            sequencer: TurnSequencer::new(log.clone())
                .with_lock_wait(Duration::from_millis(config.timeouts.session_lock_ms)),
            memory: MemoryWindow::new(log).with_exchanges(config.memory.window_exchanges),
            extractor: IntentExtractor::from_config(&config.intents)?,
            router,
            composer: ResponseComposer::from_config(&config.composer),
            settings: TurnSettings::from_config(config),
        })
    }

    pub fn with_settings(mut self, settings: TurnSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_composer(mut self, composer: ResponseComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.sequencer = self.sequencer.with_lock_wait(wait);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run one turn for `session_id`.
    pub async fn process_message(&self, session_id: &str, user_message: &str) -> Result<TurnReply, TurnError> {
        validate_session_id(session_id)?;
        let text = validate_message(user_message)?;

        info!(session_id, preview = %prompt::preview(text), "Processing message");

        let handle = self.begin_with_retry(session_id).await?;

        let drafted = match self.draft(&handle, text).await {
            Ok(drafted) => drafted,
            Err(e) => {
                warn!(session_id, code = e.code(), error = %e, "Turn aborted");
                self.sequencer.abort_turn(handle, e.code());
                return Err(e);
            }
        };

        let elapsed_ms = handle.elapsed().as_millis() as u64;
        let turn = self
            .sequencer
            .commit_turn(handle, user_message, &drafted.text, drafted.tool_calls.clone())
            .await?;

        info!(
            session_id,
            turn_index = turn.turn_index,
            tool = drafted.tool_calls.first().map(String::as_str).unwrap_or("none"),
            elapsed_ms,
            "Turn completed"
        );

        Ok(TurnReply {
            message: drafted.text,
            session_id: session_id.to_string(),
            turn_index: turn.turn_index,
            tool_calls: drafted.tool_calls,
            timestamp: turn.committed_at,
        })
    }

    /// Full committed history of a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<StoredMessage>, TurnError> {
        validate_session_id(session_id)?;
        Ok(self.sequencer.log().history(session_id).await?)
    }

    async fn begin_with_retry(&self, session_id: &str) -> Result<TurnHandle, TurnError> {
        let mut attempt = 0;
        loop {
            match self.sequencer.begin_turn(session_id).await {
                Err(TurnError::SessionBusy { .. }) if attempt < self.settings.busy_retries => {
                    let backoff = self.settings.busy_backoff * 2u32.saturating_pow(attempt);
                    attempt += 1;
                    debug!(session_id, attempt, backoff_ms = backoff.as_millis() as u64, "Session busy, retrying");
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }

    /// Everything between `begin_turn` and the commit.
    async fn draft(&self, handle: &TurnHandle, user_message: &str) -> Result<Drafted, TurnError> {
        let session_id = handle.session_id();
        let window = self.memory.load(session_id).await?;

        let catalog = self.catalog.product_names().await.unwrap_or_else(|e| {
            warn!(session_id, error = %e, "Product names unavailable, matching without catalog");
            Vec::new()
        });
        let intent = self.extractor.extract(user_message, &catalog);
        debug!(session_id, ?intent, "Intent extracted");

        let mut invocation = self.router.dispatch(&intent).await?;

        let system = prompt::system_prompt(
            &window,
            self.memory.exchanges(),
            self.composer.max_words(),
            self.composer.summary_prefix(),
        );
        let context = invocation
            .as_ref()
            .map(|inv| prompt::tool_context(inv, &supportdesk_tools::describe(&inv.outcome)));
        let mut messages = prompt::build_messages(system, user_message, context);

        // The model may pick a tool only when the message named none.
        let tools = if intent.is_none() { self.router.definitions() } else { Vec::new() };
        let deadline = Instant::now() + self.settings.model_timeout;

        let response = self.call_model(messages.clone(), tools, deadline).await?;
        let mut draft = response.message.content.clone();

        if invocation.is_none() {
            if let Some(call) = response.message.tool_calls.first() {
                let requested = Intent::from_tool_call(&call.name, &call.arguments);
                if requested.is_none() {
                    debug!(session_id, tool = %call.name, "Ignoring unrecognized tool call");
                } else if let Some(inv) = self.router.dispatch(&requested).await? {
                    prompt::append_tool_result(&mut messages, call, &supportdesk_tools::describe(&inv.outcome));
                    draft = self.call_model(messages, Vec::new(), deadline).await?.message.content;
                    invocation = Some(inv);
                }
            }
        }

        let text = self.composer.compose(&draft, invocation.as_ref());
        Ok(Drafted {
            text,
            tool_calls: tool_names(invocation.as_ref()),
        })
    }

    async fn call_model(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        deadline: Instant,
    ) -> Result<ProviderResponse, TurnError> {
        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            tools,
        };

        let after_secs = self.settings.model_timeout.as_secs();
        match tokio::time::timeout_at(deadline, self.provider.complete(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(ProviderError::Timeout(reason))) => {
                warn!(provider = self.provider.name(), reason = %reason, "Model request timed out");
                Err(TurnError::ModelTimeout { after_secs })
            }
            Ok(Err(e)) => {
                warn!(provider = self.provider.name(), error = %e, "Model call failed");
                Err(TurnError::ModelUnavailable(e))
            }
            Err(_) => {
                warn!(provider = self.provider.name(), after_secs, "Model deadline expired");
                Err(TurnError::ModelTimeout { after_secs })
            }
        }
    }
}

fn tool_names(invocation: Option<&ToolInvocation>) -> Vec<String> {
    invocation.map(|inv| vec![inv.kind.name().to_string()]).unwrap_or_default()
}

fn validate_session_id(session_id: &str) -> Result<(), TurnError> {
    if session_id.trim().is_empty() {
        return Err(TurnError::InvalidInput("session_id must not be empty".into()));
    }
    if session_id.chars().count() > MAX_SESSION_ID_CHARS {
        return Err(TurnError::InvalidInput(format!(
            "session_id must be at most {MAX_SESSION_ID_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_message(user_message: &str) -> Result<&str, TurnError> {
    let trimmed = user_message.trim();
    if trimmed.is_empty() {
        return Err(TurnError::InvalidInput("user_message must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(TurnError::InvalidInput(format!(
            "user_message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use supportdesk_core::message::Role;

    fn quick_settings() -> TurnSettings {
        TurnSettings {
            model_timeout: Duration::from_millis(200),
            ..TurnSettings::default()
        }
    }

    async fn orchestrator(
        dir: &tempfile::TempDir,
        provider: Arc<dyn Provider>,
    ) -> (TurnOrchestrator, Arc<supportdesk_store::SqliteStore>) {
        let store = seeded_store(dir).await;
        let orchestrator = TurnOrchestrator::new(provider, store.clone(), store.clone())
            .unwrap()
            .with_settings(quick_settings());
        (orchestrator, store)
    }

    #[tokio::test]
    async fn rejects_invalid_input_before_any_turn() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FixedProvider::new("ok"));
        let (orchestrator, store) = orchestrator(&dir, provider.clone()).await;

        let err = orchestrator.process_message("s1", "   ").await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = orchestrator.process_message("", "Halo").await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(orchestrator.process_message("s1", &long).await.is_err());

        let long_id = "s".repeat(MAX_SESSION_ID_CHARS + 1);
        assert!(orchestrator.process_message(&long_id, "Halo").await.is_err());

        assert_eq!(provider.request_count(), 0);
        assert_eq!(store.message_count("s1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn user_text_is_stored_as_sent() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FixedProvider::new("Baik."));
        let (orchestrator, store) = orchestrator(&dir, provider.clone()).await;

        orchestrator.process_message("s1", "  Cek ORD123\n").await.unwrap();

        let history = store.history("s1").await.unwrap();
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "  Cek ORD123\n");

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].messages.last().unwrap().content, "Cek ORD123");
    }

    #[tokio::test]
    async fn memory_window_reaches_the_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FixedProvider::new("Baik."));
        let (orchestrator, _) = orchestrator(&dir, provider.clone()).await;

        orchestrator.process_message("s1", "Halo").await.unwrap();
        orchestrator.process_message("s1", "Terima kasih").await.unwrap();

        let requests = provider.requests.lock().unwrap();
        let first_system = &requests[0].messages[0].content;
        let second_system = &requests[1].messages[0].content;
        assert!(first_system.contains("Tidak ada riwayat percakapan sebelumnya."));
        assert!(second_system.contains("Pengguna: Halo"));
        assert_eq!(requests[1].messages.last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn tools_offered_only_without_extracted_intent() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FixedProvider::new("Baik."));
        let (orchestrator, _) = orchestrator(&dir, provider.clone()).await;

        orchestrator.process_message("s1", "Halo").await.unwrap();
        orchestrator.process_message("s1", "Cek ORD123").await.unwrap();

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].tools.len(), 3);
        assert!(requests[1].tools.is_empty());
        assert!(requests[1].messages[1].content.contains("HASIL TOOL get_order_status"));
    }

    #[tokio::test]
    async fn model_requested_tool_is_dispatched_once() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![
            make_tool_call("get_warranty_policy", "{}"),
            make_text_response("Silakan ikuti prosedur di atas.", "mock"),
        ]));
        let (orchestrator, _) = orchestrator(&dir, provider.clone()).await;

        let reply = orchestrator.process_message("s1", "Barang saya rusak, bagaimana?").await.unwrap();
        assert_eq!(reply.tool_calls, vec!["get_warranty_policy"]);
        assert!(reply.message.contains("0800-1234-5678"));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn unknown_model_tool_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![make_tool_call("delete_everything", "{}")]));
        let (orchestrator, _) = orchestrator(&dir, provider.clone()).await;

        let reply = orchestrator.process_message("s1", "Halo").await.unwrap();
        assert!(reply.tool_calls.is_empty());
        assert_eq!(reply.turn_index, 1);
        assert_eq!(provider.calls(), 1);
        // Empty draft and no tool: fallback reply.
        assert!(reply.message.contains("Status Pesanan"));
    }

    #[tokio::test]
    async fn provider_failure_aborts_turn() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FailingProvider(ProviderError::Network("connection refused".into())));
        let (orchestrator, store) = orchestrator(&dir, provider).await;

        let err = orchestrator.process_message("s1", "Halo").await.unwrap_err();
        assert!(matches!(err, TurnError::ModelUnavailable(_)));
        assert!(err.is_retryable());
        assert_eq!(store.message_count("s1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn provider_timeout_maps_to_model_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FailingProvider(ProviderError::Timeout("read timeout".into())));
        let (orchestrator, _) = orchestrator(&dir, provider).await;

        let err = orchestrator.process_message("s1", "Halo").await.unwrap_err();
        assert_eq!(err.code(), "model_timeout");
    }

    #[tokio::test]
    async fn session_is_free_after_abort() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;
        let failing = TurnOrchestrator::new(
            Arc::new(FailingProvider(ProviderError::Network("down".into()))),
            store.clone(),
            store.clone(),
        )
        .unwrap()
        .with_lock_wait(Duration::from_millis(100));
        assert!(failing.process_message("s1", "Halo").await.is_err());
        assert!(failing.process_message("s1", "Halo").await.is_err());

        let working = TurnOrchestrator::new(Arc::new(FixedProvider::new("Hai")), store.clone(), store.clone()).unwrap();
        let reply = working.process_message("s1", "Halo").await.unwrap();
        assert_eq!(reply.turn_index, 1);
    }

    #[tokio::test]
    async fn history_is_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FixedProvider::new("Baik."));
        let (orchestrator, _) = orchestrator(&dir, provider).await;

        orchestrator.process_message("s1", "Halo").await.unwrap();
        orchestrator.process_message("s1", "Cek ORD124").await.unwrap();

        let history = orchestrator.history("s1").await.unwrap();
        let turns: Vec<(u32, Role)> = history.iter().map(|m| (m.turn_index, m.role)).collect();
        assert_eq!(
            turns,
            vec![(1, Role::User), (1, Role::Assistant), (2, Role::User), (2, Role::Assistant)]
        );
        assert_eq!(history[3].tool_calls, vec!["get_order_status"]);
        assert!(orchestrator.history("nobody").await.unwrap().is_empty());
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.timeouts.model_secs = 5;
        config.provider.default_model = "qwen2.5:7b".into();
        let settings = TurnSettings::from_config(&config);
        assert_eq!(settings.model_timeout, Duration::from_secs(5));
        assert_eq!(settings.model, "qwen2.5:7b");
    }

    #[test]
    fn reply_serializes_rfc3339_timestamp() {
        let reply = TurnReply {
            message: "Hai".into(),
            session_id: "s1".into(),
            turn_index: 1,
            tool_calls: vec![],
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
        assert_eq!(json["turn_index"], 1);
    }
}
