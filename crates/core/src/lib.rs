//! # Supportdesk Core
//!
//! Domain types, traits, and error definitions for the supportdesk turn engine.
//! Nothing in here talks to a network or a database; it defines the model that
//! the store, tools, providers and agent crates implement against.
//!
//! ## Layout
//!
//! - [`message`]: sessions, chat messages, persisted exchanges
//! - [`entity`]: orders, products, policies (read-only reference data)
//! - [`intent`]: the closed set of intents a user message can carry
//! - [`tool`]: the lookup contract exposed to the model and its outcomes
//! - [`provider`]: the LLM backend trait
//! - [`store`]: storage traits for the catalog and the message log

pub mod entity;
pub mod error;
pub mod intent;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use entity::{Order, OrderStatus, Policy, Product};
pub use error::{Error, ProviderError, StoreError, ToolError, TurnError};
pub use intent::Intent;
pub use message::{Exchange, Message, MessageToolCall, NewExchange, Role, StoredMessage};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use store::{CatalogStore, MessageLog};
pub use tool::{ToolInvocation, ToolKind, ToolOutcome};
