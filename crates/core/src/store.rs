//! Storage traits.
//!
//! [`CatalogStore`] is the read side the lookups use; [`MessageLog`] is the
//! session history. Implementations live in `supportdesk-store`.

use async_trait::async_trait;

use crate::entity::{Order, Policy, Product};
use crate::error::StoreError;
use crate::message::{NewExchange, StoredMessage};

/// Read-only access to reference data.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Exact lookup by order id.
    async fn find_order(&self, order_id: &str) -> Result<Option<Order>, StoreError>;

    /// Case-insensitive partial match on the product name; first match by name wins.
    async fn find_product(&self, name_fragment: &str) -> Result<Option<Product>, StoreError>;

    async fn find_policy(&self, policy_type: &str) -> Result<Option<Policy>, StoreError>;

    /// Every catalog product name, used by intent extraction.
    async fn product_names(&self) -> Result<Vec<String>, StoreError>;
}

/// Append-only session history.
///
/// The log owns the turn-index invariant: for every session the committed
/// indices are exactly `1..=N` and each index carries one user and one
/// assistant row.
#[async_trait]
pub trait MessageLog: Send + Sync {
    fn name(&self) -> &str;

    /// Highest committed turn index, or 0 for an unknown session.
    async fn max_turn_index(&self, session_id: &str) -> Result<u32, StoreError>;

    /// Rows of the `k` most recent committed turns, in any order.
    async fn recent_messages(&self, session_id: &str, k: usize) -> Result<Vec<StoredMessage>, StoreError>;

    /// Full history, oldest first, user before assistant within a turn.
    async fn history(&self, session_id: &str) -> Result<Vec<StoredMessage>, StoreError>;

    /// Atomically allocate the next turn index and write both rows under it.
    /// Either both rows land or neither does.
    async fn append_exchange(&self, exchange: NewExchange) -> Result<u32, StoreError>;
}
