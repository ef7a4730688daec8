//! Mock providers and fixtures for turn-engine tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use supportdesk_core::error::ProviderError;
use supportdesk_core::message::{Message, MessageToolCall};
use supportdesk_core::provider::{Provider, ProviderRequest, ProviderResponse};
use supportdesk_store::SqliteStore;
use supportdesk_store::fixtures::seed_demo;

/// Answers every request with the same text and records the requests.
pub struct FixedProvider {
    text: String,
    pub requests: Mutex<Vec<ProviderRequest>>,
}

impl FixedProvider {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        Ok(make_text_response(&self.text, &model))
    }
}

/// Returns pre-configured responses in order, then an empty draft.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    call_count: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        *self.call_count.lock().unwrap() += 1;
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(make_text_response("", &request.model));
        }
        Ok(responses.remove(0))
    }
}

/// Never answers.
pub struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

/// Fails every request with the given error.
pub struct FailingProvider(pub ProviderError);

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(self.0.clone())
    }
}

pub fn make_text_response(text: &str, model: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: None,
        model: model.to_string(),
    }
}

pub fn make_tool_call(name: &str, arguments: &str) -> ProviderResponse {
    let mut message = Message::assistant("");
    message.tool_calls.push(MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: arguments.to_string(),
    });
    ProviderResponse {
        message,
        usage: None,
        model: "mock".into(),
    }
}

/// A seeded store in a fresh temp directory.
pub async fn seeded_store(dir: &tempfile::TempDir) -> Arc<SqliteStore> {
    let store = SqliteStore::open(&dir.path().join("agent.db"), 5).await.unwrap();
    seed_demo(&store).await.unwrap();
    Arc::new(store)
}
