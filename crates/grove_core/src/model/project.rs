//! Project domain record.

use crate::model::ecosystem::EcosystemId;
use serde::{Deserialize, Serialize};

/// Storage-assigned project identifier.
pub type ProjectId = i64;

/// A node in a per-ecosystem parent/child tree.
///
/// The parent chain terminates without revisiting any node and never
/// crosses ecosystem boundaries. `ecosystem_id` is set at creation and
/// immutable; only `link_parent_project` may change `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Stable registry id.
    pub id: ProjectId,
    /// Globally unique, syntax-constrained name.
    pub name: String,
    /// Optional human-facing title.
    pub title: Option<String>,
    /// Owning ecosystem. Immutable after creation.
    pub ecosystem_id: EcosystemId,
    /// Parent project, or `None` for a root of the forest.
    pub parent_id: Option<ProjectId>,
    /// Epoch ms of the last successful mutation touching this row.
    pub last_modified: i64,
}

impl Project {
    /// Returns whether this project is a root of its ecosystem forest.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
