// crates/shellbridge-core/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Catalog of registered tools, handlers, and derived schemas.
// Purpose: Act as the single source of truth for both transports and docs.
// Dependencies: serde, serde_json, async-trait, thiserror
// ============================================================================

//! ## Overview
//! The registry maps tool names to their immutable [`ToolSpec`], the
//! [`InputSchema`] derived at registration time, and the handler invoked by
//! the dispatcher. Tools are grouped by tag for discovery and OpenAPI output.
//! The registry is built during startup and frozen (shared as `Arc`) before
//! any transport starts, so reads require no locking.
//!
//! ## Invariants
//! - Tool names are unique; a second registration under an existing name is
//!   rejected and leaves the first registration intact.
//! - Listing order is registration order; tag groups preserve per-tag
//!   registration order.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::content::ResultEnvelope;
use crate::params::ToolSpec;
use crate::schema::InputSchema;

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Failure raised by a tool handler.
///
/// Handler failures are expected (a closed window, a dead page process) and
/// are normalized into error envelopes at the dispatcher boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Builds a handler error from any displayable failure.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Asynchronous tool handler invoked with validated arguments.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Handles one invocation. `args` has passed validation and carries every
    /// declared default.
    async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError>;
}

// ============================================================================
// SECTION: Registry Types
// ============================================================================

/// Registry errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A tool with the same name is already registered.
    #[error("tool already registered: {0}")]
    Duplicate(String),
}

/// One registered tool: spec, derived schema, and handler.
pub struct RegisteredTool {
    /// Immutable tool declaration.
    pub spec: ToolSpec,
    /// Schema derived from the declaration at registration time.
    pub input_schema: InputSchema,
    /// Handler invoked by the dispatcher.
    pub handler: Arc<dyn ToolHandler>,
}

/// Discovery summary for one tool, as listed to clients.
///
/// # Invariants
/// - `input_schema` serializes as `inputSchema` for wire compatibility.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Derived input schema.
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

// ============================================================================
// SECTION: Tool Registry
// ============================================================================

/// Catalog of registered tools consumed by both transports.
#[derive(Default)]
pub struct ToolRegistry {
    /// Registered tools by name.
    tools: BTreeMap<String, Arc<RegisteredTool>>,
    /// Tool names in registration order.
    order: Vec<String>,
    /// Tag to tool names, preserving per-tag registration order.
    tags: BTreeMap<String, Vec<String>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its declared name and tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the name is already taken;
    /// the existing registration is left untouched.
    pub fn register(
        &mut self,
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.tools.contains_key(&spec.name) {
            return Err(RegistryError::Duplicate(spec.name.clone()));
        }
        let input_schema = InputSchema::derive(&spec.params);
        let name = spec.name.clone();
        let tag = spec.tag.clone();
        self.tools.insert(
            name.clone(),
            Arc::new(RegisteredTool {
                spec,
                input_schema,
                handler,
            }),
        );
        self.order.push(name.clone());
        self.tags.entry(tag).or_default().push(name);
        Ok(())
    }

    /// Resolves a tool by name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        self.tools.get(name).cloned()
    }

    /// Lists all tool definitions in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.spec.name.clone(),
                description: tool.spec.description.clone(),
                input_schema: tool.input_schema.clone(),
            })
            .collect()
    }

    /// Lists tool definitions grouped by tag.
    #[must_use]
    pub fn list_by_tag(&self) -> BTreeMap<String, Vec<ToolDefinition>> {
        let mut grouped = BTreeMap::new();
        for (tag, names) in &self.tags {
            let definitions: Vec<ToolDefinition> = names
                .iter()
                .filter_map(|name| self.tools.get(name))
                .map(|tool| ToolDefinition {
                    name: tool.spec.name.clone(),
                    description: tool.spec.description.clone(),
                    input_schema: tool.input_schema.clone(),
                })
                .collect();
            grouped.insert(tag.clone(), definitions);
        }
        grouped
    }

    /// Returns the tag a tool was registered under, if present.
    #[must_use]
    pub fn tag_of(&self, name: &str) -> Option<&str> {
        self.tools.get(name).map(|tool| tool.spec.tag.as_str())
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
