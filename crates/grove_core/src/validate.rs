//! Field and name syntax rules.
//!
//! # Responsibility
//! - Check text fields and registry names before anything touches
//!   storage.
//!
//! # Invariants
//! - All checks are pure: no state, no I/O.
//! - A failed check leaves no partial state anywhere, so callers never
//!   need to roll back validation failures.

use crate::error::{RegistryError, RegistryResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static WHITESPACE_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+$").expect("whitespace-only pattern must compile"));

/// Validates a text field value.
///
/// `None` is rejected unless `allow_none` is set; present values must be
/// non-empty and contain at least one non-whitespace character.
pub fn validate_field(
    field: &str,
    value: Option<&str>,
    allow_none: bool,
) -> RegistryResult<()> {
    let Some(value) = value else {
        if allow_none {
            return Ok(());
        }
        return Err(RegistryError::InvalidValue(format!(
            "'{field}' cannot be None"
        )));
    };

    if value.is_empty() {
        return Err(RegistryError::InvalidValue(format!(
            "'{field}' cannot be an empty string"
        )));
    }
    if WHITESPACE_ONLY.is_match(value) {
        return Err(RegistryError::InvalidValue(format!(
            "'{field}' cannot be composed by whitespaces only"
        )));
    }

    Ok(())
}

/// Validates a registry name.
///
/// On top of the field rules, a name must start with an alphanumeric
/// character, contain no whitespace, and use no punctuation other than
/// hyphens.
pub fn validate_name(value: &str) -> RegistryResult<()> {
    validate_field("name", Some(value), false)?;

    if !value.chars().next().is_some_and(char::is_alphanumeric) {
        return Err(RegistryError::InvalidValue(
            "'name' must start with an alphanumeric character".to_string(),
        ));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(RegistryError::InvalidValue(
            "'name' cannot contain whitespace characters".to_string(),
        ));
    }
    if value
        .chars()
        .any(|c| c.is_ascii_punctuation() && c != '-')
    {
        return Err(RegistryError::InvalidValue(
            "'name' cannot contain punctuation characters except hyphens".to_string(),
        ));
    }

    Ok(())
}

/// Validates a loosely-typed field value at the JSON boundary.
///
/// The typed mutation API cannot receive a non-string where a string
/// belongs, so this is the entry point for callers decoding JSON input
/// (the API surface, operation-args readers). Returns the borrowed text
/// when present.
pub fn validate_raw_field<'a>(
    field: &str,
    value: Option<&'a Value>,
    allow_none: bool,
) -> RegistryResult<Option<&'a str>> {
    match value {
        None | Some(Value::Null) => {
            validate_field(field, None, allow_none)?;
            Ok(None)
        }
        Some(Value::String(text)) => {
            validate_field(field, Some(text), allow_none)?;
            Ok(Some(text))
        }
        Some(other) => Err(RegistryError::TypeMismatch {
            field: field.to_string(),
            given: json_type_name(other),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
