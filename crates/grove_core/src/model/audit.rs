//! Audit trail records.
//!
//! # Responsibility
//! - Define the durable shape of transactions and operations.
//!
//! # Invariants
//! - An operation belongs to exactly one transaction and never outlives
//!   it.
//! - `args` is the raw input snapshot taken before validation touched
//!   anything, so a closed transaction can be replayed verbatim.

use crate::model::EntityKind;
use serde::{Deserialize, Serialize};

/// The four atomic mutations the registry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpType {
    Add,
    Update,
    Delete,
    Link,
}

impl OpType {
    /// Uppercase tag stored in `operations.op_type`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Link => "LINK",
        }
    }

    /// Parses the stored tag back into an op type.
    pub fn parse_tag(value: &str) -> Option<Self> {
        match value {
            "ADD" => Some(Self::Add),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            "LINK" => Some(Self::Link),
            _ => None,
        }
    }
}

/// One durable record of a caller-initiated unit of work.
///
/// Created open; becomes closed, and therefore visible to readers, only
/// when its unit of work commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction token (uuid4 hex).
    pub tuid: String,
    /// Name of the registry operation that opened the transaction.
    pub name: String,
    /// Epoch ms when the transaction was opened.
    pub created_at: i64,
    /// Epoch ms when the transaction was closed, if it has been.
    pub closed_at: Option<i64>,
    /// Whether the unit of work finished without error.
    pub is_closed: bool,
    /// Acting principal; `None` for unauthenticated or system actions.
    pub authored_by: Option<String>,
}

/// One durable record of a single atomic mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation token (uuid4 hex).
    pub ouid: String,
    /// Owning transaction token.
    pub tuid: String,
    /// Which mutation this records.
    pub op_type: OpType,
    /// Kind of the affected entity.
    pub entity_type: EntityKind,
    /// Name of the entity for ADD; its decimal id otherwise.
    pub target: String,
    /// Epoch ms when the operation was recorded.
    pub timestamp: i64,
    /// Raw input snapshot, round-tripped through JSON.
    pub args: serde_json::Value,
}
