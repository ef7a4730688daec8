//! Entity store for supportdesk.
//!
//! One SQLite database holds the reference data the lookups read (orders,
//! products, policies) and the per-session message log the turn sequencer
//! appends to.

pub mod fixtures;
pub mod sqlite;

pub use sqlite::SqliteStore;
