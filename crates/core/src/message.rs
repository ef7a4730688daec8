//! Message and exchange types.
//!
//! Two families live here: [`Message`] is what goes to and comes back from a
//! model provider, while [`StoredMessage`] and [`Exchange`] are the persisted
//! shape of a session's history. Only user and assistant rows are ever
//! persisted; system and tool messages exist for the length of one request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The support assistant
    Assistant,
    /// System instructions (persona, rules, context)
    System,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

/// A single message sent to or received from a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

/// One persisted row of a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub turn_index: u32,
    /// Tool names recorded with an assistant row; always empty for user rows.
    #[serde(default)]
    pub tool_calls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A committed (user, assistant) pair sharing one turn index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub turn_index: u32,
    pub user: String,
    pub assistant: String,
    #[serde(default)]
    pub tool_calls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Exchange {
    /// Pair up rows into exchanges, oldest first.
    ///
    /// Rows may arrive in any order. A turn index that lacks either side is
    /// dropped, which cannot happen for rows written through
    /// [`crate::store::MessageLog::append_exchange`].
    pub fn pair(rows: Vec<StoredMessage>) -> Vec<Exchange> {
        use std::collections::BTreeMap;

        let mut by_turn: BTreeMap<u32, (Option<StoredMessage>, Option<StoredMessage>)> = BTreeMap::new();
        for row in rows {
            let slot = by_turn.entry(row.turn_index).or_default();
            match row.role {
                Role::User => slot.0 = Some(row),
                Role::Assistant => slot.1 = Some(row),
                Role::System | Role::Tool => {}
            }
        }

        by_turn
            .into_iter()
            .filter_map(|(turn_index, pair)| match pair {
                (Some(user), Some(assistant)) => Some(Exchange {
                    turn_index,
                    user: user.content,
                    assistant: assistant.content,
                    tool_calls: assistant.tool_calls,
                    created_at: user.created_at,
                }),
                _ => None,
            })
            .collect()
    }
}

/// The payload of a commit: both sides of one exchange.
#[derive(Debug, Clone)]
pub struct NewExchange {
    pub session_id: String,
    pub user_content: String,
    pub assistant_content: String,
    pub tool_calls: Vec<String>,
    pub created_at: DateTime<Utc>,
}
