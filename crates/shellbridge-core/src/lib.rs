// crates/shellbridge-core/src/lib.rs
// ============================================================================
// Module: shellbridge-core
// Description: Tool model, schema derivation, validation, and dispatch.
// Purpose: Transport-independent invocation engine shared by all surfaces.
// Dependencies: serde, serde_json, async-trait, thiserror, tokio
// ============================================================================

//! ## Overview
//! `shellbridge-core` defines the tool model for the automation bridge: how
//! tools declare their parameters, how JSON Schemas are derived from those
//! declarations, how raw arguments are validated and defaulted, and how a
//! single dispatcher turns every invocation (including failures and panics)
//! into a result envelope. Transports in `shellbridge-server` and the tool
//! catalog in `shellbridge-tools` both build on this crate; nothing here
//! knows about HTTP, sessions, or hosts.
//!
//! ## Invariants
//! - Registration is the only source of truth: schemas are derived from
//!   parameter specs, never hand-written per transport.
//! - Identical registries produce byte-identical schema and listing output.
//! - Dispatch is infallible: once a name and arguments reach the dispatcher,
//!   the caller gets an envelope, never a transport error.

pub mod content;
pub mod dispatch;
pub mod params;
pub mod registry;
pub mod schema;
pub mod validate;

pub use content::ContentBlock;
pub use content::ResultEnvelope;
pub use dispatch::Dispatcher;
pub use params::DEFAULT_TAG;
pub use params::FieldKind;
pub use params::FieldSpec;
pub use params::ParamSpec;
pub use params::ToolSpec;
pub use registry::HandlerError;
pub use registry::RegisteredTool;
pub use registry::RegistryError;
pub use registry::ToolDefinition;
pub use registry::ToolHandler;
pub use registry::ToolRegistry;
pub use schema::InputSchema;
pub use schema::PropertySchema;
pub use validate::ValidationError;
pub use validate::validate;
