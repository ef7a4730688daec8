//! Turn sequencer — the only writer of session messages.
//!
//! A turn holds its session exclusively from [`TurnSequencer::begin_turn`]
//! until it is committed or aborted. Waiters queue in admission order (the
//! tokio mutex is fair). The durable counter in the message log stays the
//! source of truth for indices, so the in-process lock only orders and
//! parks same-session requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use supportdesk_core::error::TurnError;
use supportdesk_core::message::NewExchange;
use supportdesk_core::store::MessageLog;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(10);

/// One async mutex per session with a live turn or waiter.
#[derive(Default)]
struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionLocks {
    fn entry(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(session_id.to_string()).or_default().clone()
    }

    /// Drop the session's mutex once nobody holds or waits on it.
    fn release(&self, session_id: &str) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if map.get(session_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            map.remove(session_id);
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or_default()
    }
}

/// Exclusive hold on a session for one turn.
///
/// Dropping the handle without committing aborts the turn.
pub struct TurnHandle {
    session_id: String,
    previous_max: u32,
    started_at: Instant,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<SessionLocks>,
}

impl TurnHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Highest committed index when the turn began.
    pub fn previous_max(&self) -> u32 {
        self.previous_max
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Drop for TurnHandle {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.session_id);
    }
}

impl std::fmt::Debug for TurnHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnHandle")
            .field("session_id", &self.session_id)
            .field("previous_max", &self.previous_max)
            .finish()
    }
}

/// A committed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedTurn {
    pub turn_index: u32,
    pub committed_at: DateTime<Utc>,
}

pub struct TurnSequencer {
    log: Arc<dyn MessageLog>,
    locks: Arc<SessionLocks>,
    lock_wait: Duration,
}

impl TurnSequencer {
    pub fn new(log: Arc<dyn MessageLog>) -> Self {
        Self {
            log,
            locks: Arc::new(SessionLocks::default()),
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    /// How long `begin_turn` waits for a busy session.
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn log(&self) -> &Arc<dyn MessageLog> {
        &self.log
    }

    /// Sessions that currently have a turn in flight or queued.
    pub fn active_sessions(&self) -> usize {
        self.locks.len()
    }

    /// Take the session and read its current max index.
    pub async fn begin_turn(&self, session_id: &str) -> Result<TurnHandle, TurnError> {
        let started_at = Instant::now();
        let lock = self.locks.entry(session_id);

        let guard = match tokio::time::timeout(self.lock_wait, lock.lock_owned()).await {
            Ok(guard) => guard,
            Err(_) => {
                self.locks.release(session_id);
                let waited_ms = started_at.elapsed().as_millis() as u64;
                warn!(session_id, waited_ms, "Session busy");
                return Err(TurnError::SessionBusy {
                    session_id: session_id.to_string(),
                    waited_ms,
                });
            }
        };

        let mut handle = TurnHandle {
            session_id: session_id.to_string(),
            previous_max: 0,
            started_at,
            guard: Some(guard),
            locks: self.locks.clone(),
        };

        // On error the handle drops here and frees the session.
        handle.previous_max = self.log.max_turn_index(session_id).await?;

        debug!(
            session_id,
            previous_max = handle.previous_max,
            waited_ms = started_at.elapsed().as_millis() as u64,
            "Turn started"
        );
        Ok(handle)
    }

    /// Persist both sides of the exchange under the next index.
    pub async fn commit_turn(
        &self,
        handle: TurnHandle,
        user_text: &str,
        assistant_text: &str,
        tool_names: Vec<String>,
    ) -> Result<CommittedTurn, TurnError> {
        let committed_at = Utc::now();
        let turn_index = self
            .log
            .append_exchange(NewExchange {
                session_id: handle.session_id.clone(),
                user_content: user_text.to_string(),
                assistant_content: assistant_text.to_string(),
                tool_calls: tool_names,
                created_at: committed_at,
            })
            .await?;

        if turn_index != handle.previous_max + 1 {
            // Another process appended to this session while we held it.
            warn!(
                session_id = %handle.session_id,
                expected = handle.previous_max + 1,
                turn_index,
                "Turn index moved under the session lock"
            );
        }

        debug!(
            session_id = %handle.session_id,
            turn_index,
            elapsed_ms = handle.elapsed().as_millis() as u64,
            "Turn committed"
        );
        Ok(CommittedTurn { turn_index, committed_at })
    }

    /// Give up the turn. Nothing was written, so no index is consumed.
    pub fn abort_turn(&self, handle: TurnHandle, reason: &str) {
        debug!(
            session_id = %handle.session_id,
            reason,
            elapsed_ms = handle.elapsed().as_millis() as u64,
            "Turn aborted"
        );
    }
}
