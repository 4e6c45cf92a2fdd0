//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define storage contracts consumed by the registry engine.
//! - Isolate SQLite query details from engine orchestration.
//!
//! # Invariants
//! - Uniqueness violations leave the repository as `AlreadyExists`,
//!   never as a raw storage error.
//! - Repositories report semantic `NotFound` for writes that matched
//!   zero rows.

use crate::error::RegistryError;
use crate::model::EntityKind;
use rusqlite::ffi;

pub mod ecosystem_repo;
pub mod project_repo;

/// Translates a storage write error into the domain taxonomy.
///
/// A unique-constraint violation, recognized by its typed extended
/// result code, becomes `AlreadyExists` carrying the entity kind and the
/// value the caller tried to write. Writers are serialized by the
/// enclosing IMMEDIATE transaction, so that input value is the
/// duplicated value. Everything else passes through unchanged.
pub(crate) fn translate_write_error(
    err: rusqlite::Error,
    kind: EntityKind,
    value: &str,
) -> RegistryError {
    if is_unique_violation(&err) {
        return RegistryError::AlreadyExists {
            kind,
            value: value.to_string(),
        };
    }
    err.into()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
