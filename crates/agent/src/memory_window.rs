//! Memory window — the last K committed exchanges of a session.

use std::sync::Arc;

use supportdesk_core::error::StoreError;
use supportdesk_core::message::Exchange;
use supportdesk_core::store::MessageLog;
use tracing::debug;

pub const DEFAULT_WINDOW_EXCHANGES: usize = 3;

/// Read-only view over a session's recent exchanges.
#[derive(Clone)]
pub struct MemoryWindow {
    log: Arc<dyn MessageLog>,
    exchanges: usize,
}

impl MemoryWindow {
    pub fn new(log: Arc<dyn MessageLog>) -> Self {
        Self {
            log,
            exchanges: DEFAULT_WINDOW_EXCHANGES,
        }
    }

    pub fn with_exchanges(mut self, k: usize) -> Self {
        self.exchanges = k;
        self
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    pub async fn load(&self, session_id: &str) -> Result<Vec<Exchange>, StoreError> {
        load_window(self.log.as_ref(), session_id, self.exchanges).await
    }
}

/// Up to `k` exchanges with the highest committed turn indices, oldest first.
///
/// Only committed turns are visible; an in-flight turn never shows up here.
pub async fn load_window(log: &dyn MessageLog, session_id: &str, k: usize) -> Result<Vec<Exchange>, StoreError> {
    if k == 0 {
        return Ok(Vec::new());
    }

    let rows = log.recent_messages(session_id, k).await?;
    let mut window = Exchange::pair(rows);
    if window.len() > k {
        window.drain(..window.len() - k);
    }

    debug!(session_id, exchanges = window.len(), backend = log.name(), "Loaded memory window");
    Ok(window)
}
