//! End-to-end turn scenarios against a seeded SQLite store.
//!
//! These tests run the full pipeline: session sequencing, memory window,
//! intent extraction, lookups, composition and the commit.

use std::sync::Arc;
use std::time::Duration;

use supportdesk_agent::composer::word_count;
use supportdesk_agent::{TurnOrchestrator, TurnSettings};
use supportdesk_config::AppConfig;
use supportdesk_core::error::{ProviderError, TurnError};
use supportdesk_core::message::{Message, Role};
use supportdesk_core::provider::{Provider, ProviderRequest, ProviderResponse};
use supportdesk_core::store::MessageLog;
use supportdesk_store::SqliteStore;
use supportdesk_store::fixtures::seed_demo;

// ── Mock Providers ───────────────────────────────────────────────────────

/// Echoes a canned draft, optionally after a delay.
struct CannedProvider {
    draft: String,
    delay: Duration,
}

impl CannedProvider {
    fn new(draft: &str) -> Self {
        Self {
            draft: draft.to_string(),
            delay: Duration::ZERO,
        }
    }

    fn slow(draft: &str, delay: Duration) -> Self {
        Self {
            draft: draft.to_string(),
            delay,
        }
    }
}

#[async_trait::async_trait]
impl Provider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ProviderResponse {
            message: Message::assistant(&self.draft),
            usage: None,
            model: request.model,
        })
    }
}

/// Never answers.
struct HangingProvider;

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

async fn seeded_store(dir: &tempfile::TempDir) -> Arc<SqliteStore> {
    let store = SqliteStore::open(&dir.path().join("scenarios.db"), 5).await.unwrap();
    seed_demo(&store).await.unwrap();
    Arc::new(store)
}

fn engine(store: &Arc<SqliteStore>, provider: impl Provider + 'static, config: &AppConfig) -> TurnOrchestrator {
    TurnOrchestrator::from_config(config, Arc::new(provider), store.clone(), store.clone()).unwrap()
}

fn short_timeouts() -> AppConfig {
    let mut config = AppConfig::default();
    config.timeouts.model_secs = 1;
    config
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn order_then_product_in_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let engine = engine(&store, CannedProvider::new("Semoga membantu!"), &AppConfig::default());

    let first = engine
        .process_message("user123", "Di mana pesanan saya? ID: ORD123")
        .await
        .unwrap();
    assert_eq!(first.turn_index, 1);
    assert_eq!(first.tool_calls, vec!["get_order_status"]);
    assert!(first.message.contains("JNE"));
    assert!(first.message.contains("ORD123"));
    assert!(first.message.contains("sedang dalam pengiriman"));

    let second = engine
        .process_message("user123", "Apa kelebihan Laptop Gaming X?")
        .await
        .unwrap();
    assert_eq!(second.turn_index, 2);
    assert_eq!(second.tool_calls, vec!["get_product_info"]);
    assert!(second.message.contains("Laptop Gaming X Pro"));
    assert!(second.message.contains("Rp 18.500.000"));
}

#[tokio::test]
async fn greeting_runs_no_tool_and_still_counts() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let engine = engine(&store, CannedProvider::new("Halo! Ada yang bisa saya bantu?"), &AppConfig::default());

    engine.process_message("greet", "Cek ORD124").await.unwrap();
    let reply = engine.process_message("greet", "Halo").await.unwrap();

    assert!(reply.tool_calls.is_empty());
    assert_eq!(reply.turn_index, 2);
    let last_line = reply.message.lines().last().unwrap();
    assert!(last_line.starts_with("Ringkas:"));
}

#[tokio::test]
async fn concurrent_requests_on_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let engine = Arc::new(engine(
        &store,
        CannedProvider::slow("Baik.", Duration::from_millis(50)),
        &AppConfig::default(),
    ));

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.process_message("race1", "Halo").await })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.process_message("race1", "Cek ORD125").await })
    };

    let mut indices = vec![
        a.await.unwrap().unwrap().turn_index,
        b.await.unwrap().unwrap().turn_index,
    ];
    indices.sort_unstable();
    assert_eq!(indices, vec![1, 2]);
    assert_eq!(store.message_count("race1").await.unwrap(), 4);
}

#[tokio::test]
async fn many_sessions_in_parallel_stay_contiguous() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let engine = Arc::new(engine(&store, CannedProvider::new("Baik."), &AppConfig::default()));

    let mut tasks = Vec::new();
    for session in ["a", "b", "c"] {
        for i in 0..4 {
            let engine = engine.clone();
            tasks.push(tokio::spawn(async move {
                engine.process_message(session, &format!("pesan {i}")).await.map(|r| r.turn_index)
            }));
        }
    }
    for task in futures::future::join_all(tasks).await {
        task.unwrap().unwrap();
    }

    for session in ["a", "b", "c"] {
        let history = store.history(session).await.unwrap();
        assert_eq!(history.len(), 8);
        let user_turns: Vec<u32> = history
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.turn_index)
            .collect();
        assert_eq!(user_turns, vec![1, 2, 3, 4]);
    }
}

#[tokio::test]
async fn unknown_order_is_not_fabricated() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let engine = engine(
        &store,
        CannedProvider::new("Pesanan ORD999 sedang dalam pengiriman via JNE."),
        &AppConfig::default(),
    );

    let reply = engine.process_message("s1", "Status ORD999?").await.unwrap();
    assert_eq!(reply.tool_calls, vec!["get_order_status"]);
    assert!(reply.message.contains("tidak ditemukan"));
    assert!(!reply.message.contains("sedang dalam pengiriman"));
}

#[tokio::test]
async fn reply_respects_word_limit() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let mut config = AppConfig::default();
    config.composer.max_words = 40;
    let engine = engine(&store, CannedProvider::new(&"panjang sekali ".repeat(200)), &config);

    for message in ["Halo", "Bagaimana cara klaim garansi?", "Cek ORD126"] {
        let reply = engine.process_message("limit", message).await.unwrap();
        assert!(word_count(&reply.message) <= 40, "{} words: {}", word_count(&reply.message), reply.message);
    }
}

#[tokio::test]
async fn model_timeout_consumes_no_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;

    let hanging = engine(&store, HangingProvider, &short_timeouts());
    let err = hanging.process_message("slow", "Cek ORD123").await.unwrap_err();
    assert!(matches!(err, TurnError::ModelTimeout { after_secs: 1 }));
    assert_eq!(store.message_count("slow").await.unwrap(), 0);

    let working = engine(&store, CannedProvider::new("Baik."), &AppConfig::default());
    let reply = working.process_message("slow", "Cek ORD123").await.unwrap();
    assert_eq!(reply.turn_index, 1);
}

#[tokio::test]
async fn missing_warranty_policy_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    assert!(store.delete_policy("warranty").await.unwrap());

    let engine = engine(&store, CannedProvider::new("Baik."), &AppConfig::default());
    let err = engine.process_message("w1", "Bagaimana cara klaim garansi?").await.unwrap_err();
    assert!(matches!(err, TurnError::PolicyMissing(ref t) if t == "warranty"));
    assert!(!err.is_retryable());
    assert_eq!(store.message_count("w1").await.unwrap(), 0);
}

#[tokio::test]
async fn busy_session_is_surfaced_after_retries() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let slow = Arc::new(
        engine(&store, HangingProvider, &AppConfig::default())
            .with_lock_wait(Duration::from_millis(20))
            .with_settings(TurnSettings {
                model_timeout: Duration::from_secs(5),
                busy_retries: 1,
                busy_backoff: Duration::from_millis(10),
                ..TurnSettings::default()
            }),
    );

    let holder = {
        let slow = slow.clone();
        tokio::spawn(async move { slow.process_message("busy", "Halo").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = slow.process_message("busy", "Halo lagi").await.unwrap_err();
    assert!(matches!(err, TurnError::SessionBusy { .. }));
    assert_eq!(err.code(), "session_busy");

    holder.abort();
}

#[tokio::test]
async fn window_sees_previous_turns() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(&dir).await;
    let engine = engine(&store, CannedProvider::new("Baik."), &AppConfig::default());

    for i in 1..=5 {
        engine.process_message("mem", &format!("pesan {i}")).await.unwrap();
    }
    let window = supportdesk_agent::load_window(store.as_ref(), "mem", 3).await.unwrap();
    let users: Vec<&str> = window.iter().map(|e| e.user.as_str()).collect();
    assert_eq!(users, vec!["pesan 3", "pesan 4", "pesan 5"]);
}
