//! Provider router — selects the LLM provider named in configuration.

use std::collections::HashMap;
use std::sync::Arc;
use supportdesk_config::AppConfig;
use supportdesk_core::error::ProviderError;
use supportdesk_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Holds the configured providers and knows which one is the default.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// The provider named by `default_provider`.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// Every entry under `[provider.providers.<name>]` becomes an
/// OpenAI-compatible provider; the default provider is always present even
/// if it has no explicit entry.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ProviderError> {
    let settings = &config.provider;
    let mut router = ProviderRouter::new(&settings.default_provider);

    for (name, provider_config) in &settings.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| settings.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        let provider = OpenAiCompatProvider::new(name, &base_url, &api_key)?;
        router.register(name.clone(), Arc::new(provider));
    }

    if router.get(&settings.default_provider).is_none() {
        let api_key = settings.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&settings.default_provider);
        let provider = OpenAiCompatProvider::new(&settings.default_provider, &base_url, &api_key)?;
        router.register(settings.default_provider.clone(), Arc::new(provider));
    }

    Ok(router)
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "ollama" => "http://localhost:11434/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
