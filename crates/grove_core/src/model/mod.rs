//! Registry domain model.
//!
//! # Responsibility
//! - Define the canonical records for ecosystems, projects and the
//!   audit trail.
//!
//! # Invariants
//! - Entity ids are storage-assigned and immutable.
//! - Audit records are append-only; nothing in the model mutates them.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub mod audit;
pub mod ecosystem;
pub mod project;

/// The kind of registry entity an error or operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Ecosystem,
    Project,
}

impl EntityKind {
    /// Lowercase tag stored in `operations.entity_type`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Ecosystem => "ecosystem",
            Self::Project => "project",
        }
    }

    /// Parses the stored tag back into a kind.
    pub fn parse_tag(value: &str) -> Option<Self> {
        match value {
            "ecosystem" => Some(Self::Ecosystem),
            "project" => Some(Self::Project),
            _ => None,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ecosystem => write!(f, "Ecosystem"),
            Self::Project => write!(f, "Project"),
        }
    }
}
