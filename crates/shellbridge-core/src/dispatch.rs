// crates/shellbridge-core/src/dispatch.rs
// ============================================================================
// Module: Dispatcher
// Description: Resolves tool invocations and normalizes every failure mode.
// Purpose: Guarantee both transports produce identical result envelopes.
// Dependencies: serde_json, tokio
// ============================================================================

//! ## Overview
//! The dispatcher is the single invocation path shared by every transport.
//! It resolves the tool, validates arguments against the declared parameter
//! spec, runs the handler, and folds every failure (unknown tool, validation
//! error, handler error, handler panic) into an error envelope. Invocation
//! never returns a transport-level error: once a request reaches the
//! dispatcher, the caller always gets a [`ResultEnvelope`].
//!
//! ## Invariants
//! - Unknown-tool envelopes contain the requested name verbatim.
//! - A panicking handler yields an error envelope, never a crashed server.
//! - Validation runs before the handler; handlers only ever see arguments
//!   that passed validation with defaults applied.

use std::sync::Arc;

use serde_json::Value;

use crate::content::ResultEnvelope;
use crate::registry::ToolRegistry;
use crate::validate::validate;

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Shared invocation path over a frozen [`ToolRegistry`].
#[derive(Clone)]
pub struct Dispatcher {
    /// Frozen registry; shared across transports without locking.
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    /// Wraps a frozen registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Invokes a tool by name with raw arguments.
    ///
    /// Always resolves to an envelope. Failures surface as error envelopes
    /// with a leading `Error: ` text block, matching handler-side failures.
    pub async fn invoke(&self, name: &str, args: Value) -> ResultEnvelope {
        let Some(tool) = self.registry.resolve(name) else {
            return ResultEnvelope::error(format!("Error: unknown tool: {name}"));
        };
        let validated = match validate(&tool.spec, args) {
            Ok(validated) => validated,
            Err(err) => {
                return ResultEnvelope::error(format!("Error: {}", err.message()));
            }
        };
        let handler = Arc::clone(&tool.handler);
        // Handlers run on a spawned task so a panic is contained as a
        // JoinError instead of unwinding through the transport.
        let joined = tokio::spawn(async move { handler.call(validated).await }).await;
        match joined {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(err)) => ResultEnvelope::error(format!("Error: {err}")),
            Err(join_err) if join_err.is_panic() => {
                ResultEnvelope::error(format!("Error: tool `{name}` panicked during execution"))
            }
            Err(_) => ResultEnvelope::error(format!("Error: tool `{name}` was cancelled")),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Tests assert failure containment, including deliberate panics."
    )]

    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;
    use serde_json::json;

    use super::Dispatcher;
    use crate::content::ContentBlock;
    use crate::content::ResultEnvelope;
    use crate::params::FieldKind;
    use crate::params::ParamSpec;
    use crate::params::ToolSpec;
    use crate::registry::HandlerError;
    use crate::registry::ToolHandler;
    use crate::registry::ToolRegistry;

    /// Echoes the validated arguments back as JSON text.
    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError> {
            Ok(ResultEnvelope::text(args.to_string()))
        }
    }

    /// Always fails with a handler error.
    struct FailingHandler;

    #[async_trait]
    impl ToolHandler for FailingHandler {
        async fn call(&self, _args: Value) -> Result<ResultEnvelope, HandlerError> {
            Err(HandlerError::new("window 7 not found"))
        }
    }

    /// Panics unconditionally.
    struct PanickingHandler;

    #[async_trait]
    impl ToolHandler for PanickingHandler {
        async fn call(&self, _args: Value) -> Result<ResultEnvelope, HandlerError> {
            panic!("handler bug");
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = ToolRegistry::new();
        let echo_spec = ToolSpec::new(
            "echo",
            "echoes arguments",
            ParamSpec::new()
                .required("message", FieldKind::Text, "message to echo")
                .with_default("repeat", FieldKind::Integer, json!(1), "repeat count"),
        );
        registry
            .register(echo_spec, Arc::new(EchoHandler))
            .expect("register echo");
        registry
            .register(
                ToolSpec::new("broken", "always fails", ParamSpec::new()),
                Arc::new(FailingHandler),
            )
            .expect("register broken");
        registry
            .register(
                ToolSpec::new("crashy", "always panics", ParamSpec::new()),
                Arc::new(PanickingHandler),
            )
            .expect("register crashy");
        Dispatcher::new(Arc::new(registry))
    }

    fn first_text(envelope: &ResultEnvelope) -> &str {
        match envelope.content.first().expect("content block") {
            ContentBlock::Text { text } => text,
            ContentBlock::Image { .. } => panic!("expected text block"),
        }
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_envelope_with_name() {
        let envelope = dispatcher().invoke("no_such_tool", json!({})).await;
        assert!(envelope.is_error);
        assert!(first_text(&envelope).contains("no_such_tool"));
    }

    #[tokio::test]
    async fn validation_failure_yields_error_envelope() {
        let envelope = dispatcher().invoke("echo", json!({})).await;
        assert!(envelope.is_error);
        let text = first_text(&envelope);
        assert!(text.starts_with("Error: "));
        assert!(text.contains("message"));
    }

    #[tokio::test]
    async fn handler_sees_defaults_applied() {
        let envelope = dispatcher().invoke("echo", json!({"message": "hi"})).await;
        assert!(!envelope.is_error);
        let echoed: Value =
            serde_json::from_str(first_text(&envelope)).expect("handler echoes JSON");
        assert_eq!(echoed["message"], json!("hi"));
        assert_eq!(echoed["repeat"], json!(1));
    }

    #[tokio::test]
    async fn handler_error_becomes_error_envelope() {
        let envelope = dispatcher().invoke("broken", json!({})).await;
        assert!(envelope.is_error);
        assert_eq!(first_text(&envelope), "Error: window 7 not found");
    }

    #[tokio::test]
    async fn handler_panic_is_contained() {
        let envelope = dispatcher().invoke("crashy", json!({})).await;
        assert!(envelope.is_error);
        assert!(first_text(&envelope).contains("panicked"));
    }

    #[tokio::test]
    async fn null_arguments_are_treated_as_empty() {
        let envelope = dispatcher().invoke("broken", Value::Null).await;
        // Reaches the handler: null normalizes to an empty object.
        assert_eq!(first_text(&envelope), "Error: window 7 not found");
    }
}
