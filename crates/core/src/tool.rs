//! The lookup contract exposed to the model, and what a lookup can produce.
//!
//! The set of tools is closed: dispatch is a `match` over [`ToolKind`], not a
//! registry keyed by strings. The string names only exist at the model
//! boundary and in persisted history.

use serde::{Deserialize, Serialize};

use crate::entity::{Order, Policy, Product};
use crate::provider::ToolDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    OrderStatus,
    ProductInfo,
    WarrantyPolicy,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [Self::OrderStatus, Self::ProductInfo, Self::WarrantyPolicy];

    /// The name the model sees and the name persisted with the assistant row.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderStatus => "get_order_status",
            Self::ProductInfo => "get_product_info",
            Self::WarrantyPolicy => "get_warranty_policy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::OrderStatus => {
                "Mencari status pesanan berdasarkan ID pesanan. Gunakan ketika user menanyakan \
                 pesanan dengan menyebutkan ID atau nomor pesanan."
            }
            Self::ProductInfo => {
                "Mencari informasi produk berdasarkan nama produk. Gunakan ketika user menanyakan \
                 spesifikasi, fitur, atau harga produk."
            }
            Self::WarrantyPolicy => {
                "Mengambil informasi kebijakan garansi dan prosedur klaim. Gunakan ketika user \
                 menanyakan tentang garansi, klaim garansi, atau warranty. Tidak memerlukan input."
            }
        }
    }

    /// JSON Schema of the single (or absent) parameter.
    pub fn parameters_schema(&self) -> serde_json::Value {
        match self {
            Self::OrderStatus => serde_json::json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string", "description": "ID pesanan, mis. ORD123" }
                },
                "required": ["order_id"]
            }),
            Self::ProductInfo => serde_json::json!({
                "type": "object",
                "properties": {
                    "product_name": { "type": "string", "description": "Nama produk yang ditanyakan" }
                },
                "required": ["product_name"]
            }),
            Self::WarrantyPolicy => serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }

    /// Definitions for every tool, in a stable order.
    pub fn definitions() -> Vec<ToolDefinition> {
        Self::ALL.iter().map(ToolKind::definition).collect()
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a single lookup produced.
///
/// `NotFound`, `TimedOut` and `Failed` are all "no usable data" for the reply;
/// they are kept apart so logs can tell them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    Order(Order),
    Product(Product),
    Warranty(Policy),
    NotFound { kind: ToolKind, query: String },
    TimedOut { kind: ToolKind, query: String, after_ms: u64 },
    Failed { kind: ToolKind, query: String, reason: String },
}

impl ToolOutcome {
    /// Whether the lookup produced data the reply can rely on.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Order(_) | Self::Product(_) | Self::Warranty(_))
    }
}

/// A lookup that ran during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub kind: ToolKind,
    /// The parameter the lookup ran with (empty for the warranty policy).
    pub input: String,
    pub outcome: ToolOutcome,
    pub elapsed_ms: u64,
}
