// crates/shellbridge-core/src/params.rs
// ============================================================================
// Module: Tool Parameter Declarations
// Description: Declarative parameter specifications for registered tools.
// Purpose: Describe a tool's argument surface once, ahead of schema derivation.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`ParamSpec`] is the single declaration of a tool's argument surface:
//! an ordered list of named fields, each with a closed-set [`FieldKind`], an
//! optionality flag, an optional default, and an optional description. Both
//! transports and the OpenAPI generator consume the [`crate::schema::InputSchema`]
//! derived from it, so declaration order is significant and preserved.
//!
//! ## Invariants
//! - Field order matches declaration order.
//! - A field with a default is never treated as required, regardless of its
//!   optionality flag.

use serde_json::Value;

// ============================================================================
// SECTION: Field Kinds
// ============================================================================

/// Closed set of primitive kinds a tool field may declare.
///
/// # Invariants
/// - Variants are stable; schema derivation maps each variant to exactly one
///   JSON-Schema type token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 text.
    Text,
    /// Integral number.
    Integer,
    /// Floating-point number.
    Number,
    /// Boolean flag.
    Boolean,
    /// Array of text values.
    TextArray,
    /// Free-form JSON object.
    Object,
    /// Untyped field; derivation falls back to the `string` token so an
    /// unmapped declaration never blocks registration.
    Opaque,
}

impl FieldKind {
    /// Returns the JSON-Schema type token for this kind.
    #[must_use]
    pub const fn type_token(self) -> &'static str {
        match self {
            Self::Text | Self::Opaque => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::TextArray => "array",
            Self::Object => "object",
        }
    }
}

// ============================================================================
// SECTION: Field Specifications
// ============================================================================

/// Declaration for a single tool argument field.
///
/// # Invariants
/// - `name` is unique within its owning [`ParamSpec`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name as it appears in call arguments.
    pub name: String,
    /// Primitive kind of the field.
    pub kind: FieldKind,
    /// Whether the field may be omitted without a default.
    pub optional: bool,
    /// Default value applied when the field is omitted.
    pub default: Option<Value>,
    /// Human-readable description surfaced in derived schemas.
    pub description: Option<String>,
}

impl FieldSpec {
    /// Returns true when omission of this field is an error.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

// ============================================================================
// SECTION: Parameter Specifications
// ============================================================================

/// Ordered parameter specification for one tool.
///
/// # Invariants
/// - Field names are unique; a duplicate `push` keeps the first declaration.
#[derive(Debug, Clone, Default)]
pub struct ParamSpec {
    /// Declared fields in declaration order.
    fields: Vec<FieldSpec>,
}

impl ParamSpec {
    /// Creates an empty parameter specification.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fields: Vec::new(),
        }
    }

    /// Returns the declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the field with the given name, if declared.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Appends a field declaration, ignoring duplicates by name.
    fn push(&mut self, field: FieldSpec) {
        if self.field(&field.name).is_none() {
            self.fields.push(field);
        }
    }

    /// Adds a required field.
    #[must_use]
    pub fn required(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.push(FieldSpec {
            name: name.to_string(),
            kind,
            optional: false,
            default: None,
            description: Some(description.to_string()),
        });
        self
    }

    /// Adds an optional field without a default.
    #[must_use]
    pub fn optional(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.push(FieldSpec {
            name: name.to_string(),
            kind,
            optional: true,
            default: None,
            description: Some(description.to_string()),
        });
        self
    }

    /// Adds an optional field with a default applied on omission.
    #[must_use]
    pub fn with_default(
        mut self,
        name: &str,
        kind: FieldKind,
        default: Value,
        description: &str,
    ) -> Self {
        self.push(FieldSpec {
            name: name.to_string(),
            kind,
            optional: true,
            default: Some(default),
            description: Some(description.to_string()),
        });
        self
    }
}

// ============================================================================
// SECTION: Tool Specifications
// ============================================================================

/// Default tag applied when a tool declares none.
pub const DEFAULT_TAG: &str = "General";

/// Immutable declaration of one tool: name, description, parameters, tag.
///
/// # Invariants
/// - `name` is unique process-wide once registered.
/// - The value never changes after registration.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description for discovery.
    pub description: String,
    /// Declared argument surface.
    pub params: ParamSpec,
    /// Grouping tag for discovery and documentation.
    pub tag: String,
}

impl ToolSpec {
    /// Creates a tool specification under the default tag.
    #[must_use]
    pub fn new(name: &str, description: &str, params: ParamSpec) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params,
            tag: DEFAULT_TAG.to_string(),
        }
    }

    /// Returns a copy of this specification under the given tag.
    #[must_use]
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
