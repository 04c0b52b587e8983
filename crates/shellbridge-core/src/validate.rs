// crates/shellbridge-core/src/validate.rs
// ============================================================================
// Module: Argument Validation
// Description: Validates raw call arguments against a tool's declaration.
// Purpose: Reject malformed arguments before a handler ever sees them.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`validate`] coerces untyped call arguments into the shape a tool declared:
//! defaults are applied for omitted fields, required fields must be present,
//! and every present field must match its declared primitive kind. All
//! violations are collected into one [`ValidationError`] naming each offending
//! field, so a caller can fix a request in a single round trip.
//!
//! Unknown extra fields are tolerated and passed through unchanged; both
//! transports observe identical behavior because they share this path.
//!
//! ## Invariants
//! - Validation never mutates the tool specification.
//! - A returned argument object contains every declared default for fields the
//!   caller omitted.

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::params::FieldKind;
use crate::params::FieldSpec;
use crate::params::ToolSpec;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Argument validation failure naming the violated fields.
///
/// # Invariants
/// - The message names every offending field and its constraint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    /// Builds a validation error from collected violations.
    fn from_violations(violations: Vec<String>) -> Self {
        Self(violations.join("; "))
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates raw arguments against a tool specification.
///
/// Null or absent argument payloads are treated as an empty object so tools
/// without parameters can be called with no body.
///
/// # Errors
///
/// Returns [`ValidationError`] when the payload is not an object, a required
/// field is missing, or a field value does not match its declared kind.
pub fn validate(spec: &ToolSpec, raw: Value) -> Result<Value, ValidationError> {
    let mut args = match raw {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(ValidationError(format!(
                "arguments must be an object, got {}",
                type_name(&other)
            )));
        }
    };

    let mut violations = Vec::new();
    for field in spec.params.fields() {
        match args.get(&field.name) {
            Some(value) => {
                if let Some(violation) = check_kind(field, value) {
                    violations.push(violation);
                }
            }
            None => {
                if let Some(default) = &field.default {
                    args.insert(field.name.clone(), default.clone());
                } else if field.is_required() {
                    violations.push(format!("missing required field `{}`", field.name));
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(Value::Object(args))
    } else {
        Err(ValidationError::from_violations(violations))
    }
}

/// Checks one present value against its declared kind.
fn check_kind(field: &FieldSpec, value: &Value) -> Option<String> {
    let ok = match field.kind {
        FieldKind::Text | FieldKind::Opaque => value.is_string(),
        FieldKind::Integer => value.as_i64().is_some() || value.as_u64().is_some(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::TextArray => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        FieldKind::Object => value.is_object(),
    };
    if ok {
        None
    } else {
        Some(format!(
            "field `{}` must be {}, got {}",
            field.name,
            kind_label(field.kind),
            type_name(value)
        ))
    }
}

/// Returns a stable label for an expected kind.
const fn kind_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text | FieldKind::Opaque => "a string",
        FieldKind::Integer => "an integer",
        FieldKind::Number => "a number",
        FieldKind::Boolean => "a boolean",
        FieldKind::TextArray => "an array of strings",
        FieldKind::Object => "an object",
    }
}

/// Returns a stable label for a JSON value's type.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
