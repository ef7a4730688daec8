//! The closed set of intents a user message can carry.

use serde::{Deserialize, Serialize};

use crate::tool::ToolKind;

/// At most one intent per message. Extraction lives in the agent crate; this
/// type is shared so the model's tool calls map onto the same variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "param", rename_all = "snake_case")]
pub enum Intent {
    OrderStatus(String),
    ProductInfo(String),
    WarrantyPolicy,
    None,
}

impl Intent {
    /// The tool this intent dispatches to, if any.
    pub fn tool_kind(&self) -> Option<ToolKind> {
        match self {
            Self::OrderStatus(_) => Some(ToolKind::OrderStatus),
            Self::ProductInfo(_) => Some(ToolKind::ProductInfo),
            Self::WarrantyPolicy => Some(ToolKind::WarrantyPolicy),
            Self::None => None,
        }
    }

    /// The lookup parameter; empty for parameterless intents.
    pub fn parameter(&self) -> &str {
        match self {
            Self::OrderStatus(id) => id,
            Self::ProductInfo(name) => name,
            Self::WarrantyPolicy | Self::None => "",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Map a tool call requested by the model onto an intent.
    ///
    /// Unknown tool names, unparsable arguments and missing or blank
    /// parameters all yield [`Intent::None`].
    pub fn from_tool_call(name: &str, arguments: &str) -> Self {
        let Some(kind) = ToolKind::from_name(name) else {
            return Self::None;
        };

        let args: serde_json::Value = if arguments.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            match serde_json::from_str(arguments) {
                Ok(v) => v,
                Err(_) => return Self::None,
            }
        };

        let param = |key: &str| {
            args.get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        match kind {
            ToolKind::OrderStatus => param("order_id")
                .map(|id| Self::OrderStatus(id.to_uppercase()))
                .unwrap_or(Self::None),
            ToolKind::ProductInfo => param("product_name").map(Self::ProductInfo).unwrap_or(Self::None),
            ToolKind::WarrantyPolicy => Self::WarrantyPolicy,
        }
    }
}
