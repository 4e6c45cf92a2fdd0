//! Ecosystem domain record.

use serde::{Deserialize, Serialize};

/// Storage-assigned ecosystem identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type EcosystemId = i64;

/// Top-level grouping entity; owns a forest of projects.
///
/// `title` and `description` are never the empty string: empty input is
/// rejected on add and normalized to `None` on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ecosystem {
    /// Stable registry id.
    pub id: EcosystemId,
    /// Globally unique, syntax-constrained name.
    pub name: String,
    /// Optional human-facing title.
    pub title: Option<String>,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Epoch ms of the last successful mutation touching this row.
    pub last_modified: i64,
}
