// crates/shellbridge-core/src/schema.rs
// ============================================================================
// Module: Input Schema Derivation
// Description: Derives JSON-Schema-compatible input schemas from ParamSpecs.
// Purpose: Give both transports and the OpenAPI generator one schema source.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`InputSchema`] is a pure function of a [`ParamSpec`]: each declared field
//! maps to a `properties` entry with its JSON-Schema type token, optional
//! `description` and `default`, and membership in `required` exactly when the
//! field has neither an optional marker nor a default. Serialization preserves
//! declaration order so downstream consumers (tool listings, OpenAPI output)
//! are stable across runs.
//!
//! ## Invariants
//! - Derivation is deterministic: identical specs yield structurally identical
//!   schemas, property order included.
//! - `required` is omitted from the serialized form when empty.
//! - An untyped field falls back to the `string` token; derivation never fails.

use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use serde_json::Value;
use serde_json::json;

use crate::params::FieldKind;
use crate::params::ParamSpec;

// ============================================================================
// SECTION: Property Schemas
// ============================================================================

/// Derived schema fragment for one declared field.
///
/// # Invariants
/// - `type_token` is one of the closed JSON-Schema tokens produced by
///   [`FieldKind::type_token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySchema {
    /// Field name.
    pub name: String,
    /// JSON-Schema type token.
    pub type_token: &'static str,
    /// Item schema for array-typed fields.
    pub items: Option<Value>,
    /// Field description when declared.
    pub description: Option<String>,
    /// Default value when declared.
    pub default: Option<Value>,
}

impl Serialize for PropertySchema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.type_token)?;
        if let Some(items) = &self.items {
            map.serialize_entry("items", items)?;
        }
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        if let Some(default) = &self.default {
            map.serialize_entry("default", default)?;
        }
        map.end()
    }
}

// ============================================================================
// SECTION: Input Schemas
// ============================================================================

/// Derived, order-preserving input schema for one tool.
///
/// # Invariants
/// - `properties` order matches the source declaration order.
/// - Every name in `required` refers to a property without a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSchema {
    /// Property schemas in declaration order.
    pub properties: Vec<PropertySchema>,
    /// Names of fields that must be present in call arguments.
    pub required: Vec<String>,
}

impl InputSchema {
    /// Derives an input schema from a parameter specification.
    #[must_use]
    pub fn derive(params: &ParamSpec) -> Self {
        let mut properties = Vec::with_capacity(params.fields().len());
        let mut required = Vec::new();
        for field in params.fields() {
            let items = match field.kind {
                FieldKind::TextArray => Some(json!({ "type": "string" })),
                _ => None,
            };
            properties.push(PropertySchema {
                name: field.name.clone(),
                type_token: field.kind.type_token(),
                items,
                description: field.description.clone(),
                default: field.default.clone(),
            });
            if field.is_required() {
                required.push(field.name.clone());
            }
        }
        Self {
            properties,
            required,
        }
    }

    /// Returns the schema as a plain JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "type": "object" }))
    }
}

impl Serialize for InputSchema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        /// Ordered wrapper serializing `properties` as a JSON object.
        struct Properties<'a>(&'a [PropertySchema]);

        impl Serialize for Properties<'_> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for property in self.0 {
                    map.serialize_entry(&property.name, property)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "object")?;
        map.serialize_entry("properties", &Properties(&self.properties))?;
        if !self.required.is_empty() {
            map.serialize_entry("required", &self.required)?;
        }
        map.end()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
