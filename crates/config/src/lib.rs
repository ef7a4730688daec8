//! Configuration loading, validation, and management for supportdesk.
//!
//! Loads configuration from `~/.supportdesk/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.supportdesk/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM provider selection and parameters
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Entity store
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Memory window
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Reply shaping
    #[serde(default)]
    pub composer: ComposerConfig,

    /// Intent extraction vocabulary
    #[serde(default)]
    pub intents: IntentsConfig,

    /// Deadlines and retry budgets
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_provider")]
    pub default_provider: String,

    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Provider-specific overrides, keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "llama3.2:3b".into()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    512
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            providers: HashMap::new(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("providers", &self.providers)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:///var/lib/supportdesk/support.db`
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    format!("sqlite://{}", AppConfig::config_dir().join("supportdesk.db").display())
}
fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Number of past exchanges fed back to the model
    #[serde(default = "default_window_exchanges")]
    pub window_exchanges: usize,
}

fn default_window_exchanges() -> usize {
    3
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window_exchanges: default_window_exchanges(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Hard ceiling on words in a reply, summary line included
    #[serde(default = "default_max_words")]
    pub max_words: usize,

    #[serde(default = "default_summary_prefix")]
    pub summary_prefix: String,
}

fn default_max_words() -> usize {
    180
}
fn default_summary_prefix() -> String {
    "Ringkas:".into()
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
            summary_prefix: default_summary_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentsConfig {
    /// Order ids are this prefix followed by digits
    #[serde(default = "default_order_id_prefix")]
    pub order_id_prefix: String,

    /// Nouns that introduce a product name the catalog may not list
    #[serde(default = "default_product_nouns")]
    pub product_nouns: Vec<String>,

    #[serde(default = "default_warranty_keywords")]
    pub warranty_keywords: Vec<String>,

    /// `policies.type` the warranty lookup reads
    #[serde(default = "default_warranty_policy_type")]
    pub warranty_policy_type: String,
}

fn default_order_id_prefix() -> String {
    "ORD".into()
}
fn default_product_nouns() -> Vec<String> {
    ["laptop", "smartphone", "tablet", "produk"].into_iter().map(String::from).collect()
}
fn default_warranty_keywords() -> Vec<String> {
    ["garansi", "warranty", "klaim", "claim"].into_iter().map(String::from).collect()
}
fn default_warranty_policy_type() -> String {
    "warranty".into()
}

impl Default for IntentsConfig {
    fn default() -> Self {
        Self {
            order_id_prefix: default_order_id_prefix(),
            product_nouns: default_product_nouns(),
            warranty_keywords: default_warranty_keywords(),
            warranty_policy_type: default_warranty_policy_type(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Deadline for one model call
    #[serde(default = "default_model_secs")]
    pub model_secs: u64,

    /// Deadline for one lookup
    #[serde(default = "default_tool_ms")]
    pub tool_ms: u64,

    /// How long a turn waits for its session before `SessionBusy`
    #[serde(default = "default_session_lock_ms")]
    pub session_lock_ms: u64,

    /// Extra attempts after a `SessionBusy`
    #[serde(default = "default_busy_retries")]
    pub busy_retries: u32,
}

fn default_model_secs() -> u64 {
    30
}
fn default_tool_ms() -> u64 {
    2000
}
fn default_session_lock_ms() -> u64 {
    10_000
}
fn default_busy_retries() -> u32 {
    3
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            model_secs: default_model_secs(),
            tool_ms: default_tool_ms(),
            session_lock_ms: default_session_lock_ms(),
            busy_retries: default_busy_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.supportdesk/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides and re-validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    ///
    /// - `SUPPORTDESK_API_KEY` (only if no key is configured)
    /// - `SUPPORTDESK_PROVIDER`, `SUPPORTDESK_MODEL` (or `OLLAMA_MODEL`)
    /// - `LLM_TEMPERATURE`
    /// - `CORS_ORIGINS` (comma-separated)
    /// - `SUPPORTDESK_DATABASE_URL`
    /// - `OLLAMA_HOST` (base URL of the `ollama` provider)
    /// - `MAX_MEMORY_EXCHANGES`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if self.provider.api_key.is_none() {
            self.provider.api_key = lookup("SUPPORTDESK_API_KEY");
        }

        if let Some(provider) = lookup("SUPPORTDESK_PROVIDER") {
            self.provider.default_provider = provider;
        }

        // The specific name wins over the Ollama-era one.
        if let Some(model) = lookup("SUPPORTDESK_MODEL").or_else(|| lookup("OLLAMA_MODEL")) {
            self.provider.default_model = model;
        }

        if let Some(raw) = lookup("LLM_TEMPERATURE") {
            self.provider.temperature = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("LLM_TEMPERATURE must be a number, got '{raw}'"))
            })?;
        }

        if let Some(raw) = lookup("CORS_ORIGINS") {
            self.gateway.cors_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(url) = lookup("SUPPORTDESK_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(host) = lookup("OLLAMA_HOST") {
            let host = host.trim_end_matches('/');
            let base = if host.ends_with("/v1") { host.to_string() } else { format!("{host}/v1") };
            self.provider.providers.entry("ollama".into()).or_default().api_url = Some(base);
        }

        if let Some(raw) = lookup("MAX_MEMORY_EXCHANGES") {
            self.memory.window_exchanges = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("MAX_MEMORY_EXCHANGES must be a non-negative integer, got '{raw}'"))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".supportdesk")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let prefix = &self.intents.order_id_prefix;
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::ValidationError(
                "intents.order_id_prefix must be non-empty ASCII letters".into(),
            ));
        }

        if self.composer.summary_prefix.split_whitespace().count() == 0 {
            return Err(ConfigError::ValidationError("composer.summary_prefix must not be blank".into()));
        }

        // The summary line alone must fit.
        if self.composer.max_words < 20 {
            return Err(ConfigError::ValidationError("composer.max_words must be at least 20".into()));
        }

        if self.timeouts.model_secs == 0 || self.timeouts.tool_ms == 0 || self.timeouts.session_lock_ms == 0 {
            return Err(ConfigError::ValidationError("timeouts must be greater than zero".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError("database.max_connections must be > 0".into()));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.default_provider, "ollama");
        assert_eq!(config.provider.default_model, "llama3.2:3b");
        assert_eq!(config.memory.window_exchanges, 3);
        assert_eq!(config.composer.max_words, 180);
        assert_eq!(config.gateway.port, 8000);
        assert!(config.database.url.starts_with("sqlite://"));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.default_model, config.provider.default_model);
        assert_eq!(parsed.intents.warranty_keywords, config.intents.warranty_keywords);
        assert_eq!(parsed.timeouts.tool_ms, config.timeouts.tool_ms);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[composer]
max_words = 120

[timeouts]
model_secs = 5
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.composer.max_words, 120);
        assert_eq!(config.composer.summary_prefix, "Ringkas:");
        assert_eq!(config.timeouts.model_secs, 5);
        assert_eq!(config.timeouts.tool_ms, 2000);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_prefix_rejected() {
        let mut config = AppConfig::default();
        config.intents.order_id_prefix = "OR-".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "memory = [").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider.default_provider, "ollama");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("SUPPORTDESK_MODEL", "qwen2.5:7b"),
                ("SUPPORTDESK_DATABASE_URL", "sqlite::memory:"),
                ("OLLAMA_HOST", "http://ollama:11434/"),
                ("MAX_MEMORY_EXCHANGES", "5"),
                ("SUPPORTDESK_API_KEY", "sk-test"),
            ]))
            .unwrap();

        assert_eq!(config.provider.default_model, "qwen2.5:7b");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.memory.window_exchanges, 5);
        assert_eq!(
            config.provider.providers["ollama"].api_url.as_deref(),
            Some("http://ollama:11434/v1")
        );
        assert!(config.has_api_key());
    }

    #[test]
    fn configured_api_key_wins_over_env() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("from-file".into());
        config.apply_env(env(&[("SUPPORTDESK_API_KEY", "from-env")])).unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn ollama_era_names_are_honoured() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OLLAMA_MODEL", "mistral:7b"),
                ("LLM_TEMPERATURE", "0.2"),
                ("CORS_ORIGINS", "http://localhost:3000, https://shop.example.com,"),
            ]))
            .unwrap();

        assert_eq!(config.provider.default_model, "mistral:7b");
        assert!((config.provider.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(
            config.gateway.cors_origins,
            vec!["http://localhost:3000", "https://shop.example.com"]
        );
    }

    #[test]
    fn supportdesk_model_wins_over_ollama_model() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("OLLAMA_MODEL", "mistral:7b"), ("SUPPORTDESK_MODEL", "qwen2.5:7b")]))
            .unwrap();
        assert_eq!(config.provider.default_model, "qwen2.5:7b");
    }

    #[test]
    fn bad_temperature_env_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("LLM_TEMPERATURE", "warm")])).unwrap_err();
        assert!(err.to_string().contains("LLM_TEMPERATURE"));
    }

    #[test]
    fn bad_window_env_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("MAX_MEMORY_EXCHANGES", "three")])).unwrap_err();
        assert!(err.to_string().contains("MAX_MEMORY_EXCHANGES"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-secret".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
