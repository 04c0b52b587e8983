// crates/shellbridge-tools/src/catalog.rs
// ============================================================================
// Module: Tool Catalog
// Description: Built-in window, page, and system tools over an automation host.
// Purpose: Exercise the dispatch core end to end against any host.
// Dependencies: shellbridge-core, async-trait, base64, serde_json
// ============================================================================

//! ## Overview
//! Registers the built-in tool catalog against an [`AutomationHost`]. Each
//! tool declares its parameters once; schemas, validation, and discovery all
//! derive from that declaration. Handlers extract validated arguments,
//! delegate to the host, and map [`AutomationError`] into handler errors so
//! the dispatcher renders them as error envelopes.
//!
//! ## Invariants
//! - Handlers only read arguments their parameter spec declares; defaults
//!   (notably `win_id = 1`) are applied by validation before handlers run.
//! - Captured pages are returned as a text block followed by an image block
//!   with base64 payload and the host's MIME type.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use serde_json::json;

use shellbridge_core::ContentBlock;
use shellbridge_core::FieldKind;
use shellbridge_core::HandlerError;
use shellbridge_core::ParamSpec;
use shellbridge_core::RegistryError;
use shellbridge_core::ResultEnvelope;
use shellbridge_core::ToolHandler;
use shellbridge_core::ToolRegistry;
use shellbridge_core::ToolSpec;

use crate::host::AutomationHost;
use crate::host::InputEvent;
use crate::host::WindowId;

// ============================================================================
// SECTION: Argument Extraction
// ============================================================================

/// Reads a string argument that validation has guaranteed to be present.
fn text_arg(args: &Value, name: &str) -> Result<String, HandlerError> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| HandlerError::new(format!("missing argument `{name}`")))
}

/// Reads an integer argument as a window identifier.
fn window_arg(args: &Value, name: &str) -> Result<WindowId, HandlerError> {
    args.get(name)
        .and_then(Value::as_u64)
        .map(WindowId)
        .ok_or_else(|| HandlerError::new(format!("missing argument `{name}`")))
}

impl From<crate::host::AutomationError> for HandlerError {
    fn from(err: crate::host::AutomationError) -> Self {
        Self::new(err.to_string())
    }
}

// ============================================================================
// SECTION: Window Tools
// ============================================================================

/// `open_window`: opens a window at a URL.
struct OpenWindow(Arc<dyn AutomationHost>);

#[async_trait]
impl ToolHandler for OpenWindow {
    async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError> {
        let url = text_arg(&args, "url")?;
        let id = self.0.open_window(&url).await?;
        Ok(ResultEnvelope::text(format!(
            "Opened window {id} at {url}"
        )))
    }
}

/// `get_windows`: lists live windows as JSON.
struct GetWindows(Arc<dyn AutomationHost>);

#[async_trait]
impl ToolHandler for GetWindows {
    async fn call(&self, _args: Value) -> Result<ResultEnvelope, HandlerError> {
        let windows = self.0.list_windows().await?;
        let listing: Vec<Value> = windows
            .iter()
            .map(|w| json!({ "id": w.id.0, "url": w.url, "title": w.title }))
            .collect();
        let rendered = serde_json::to_string_pretty(&listing)
            .map_err(|err| HandlerError::new(err.to_string()))?;
        Ok(ResultEnvelope::text(rendered))
    }
}

/// `close_window`: closes a window by id.
struct CloseWindow(Arc<dyn AutomationHost>);

#[async_trait]
impl ToolHandler for CloseWindow {
    async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError> {
        let id = window_arg(&args, "win_id")?;
        self.0.close_window(id).await?;
        Ok(ResultEnvelope::text(format!("Closed window {id}")))
    }
}

/// `load_url`: navigates an existing window.
struct LoadUrl(Arc<dyn AutomationHost>);

#[async_trait]
impl ToolHandler for LoadUrl {
    async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError> {
        let url = text_arg(&args, "url")?;
        let id = window_arg(&args, "win_id")?;
        self.0.load_url(id, &url).await?;
        Ok(ResultEnvelope::text(format!(
            "Window {id} navigated to {url}"
        )))
    }
}

/// `get_title`: reads a window's page title.
struct GetTitle(Arc<dyn AutomationHost>);

#[async_trait]
impl ToolHandler for GetTitle {
    async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError> {
        let id = window_arg(&args, "win_id")?;
        let title = self.0.window_title(id).await?;
        Ok(ResultEnvelope::text(title))
    }
}

// ============================================================================
// SECTION: Page Tools
// ============================================================================

/// `exec_js`: executes a script in a window's page.
struct ExecJs(Arc<dyn AutomationHost>);

#[async_trait]
impl ToolHandler for ExecJs {
    async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError> {
        let code = text_arg(&args, "code")?;
        let id = window_arg(&args, "win_id")?;
        let result = self.0.execute_script(id, &code).await?;
        Ok(ResultEnvelope::text(result.to_string()))
    }
}

/// `screenshot`: captures a window's page as an image block.
struct Screenshot(Arc<dyn AutomationHost>);

#[async_trait]
impl ToolHandler for Screenshot {
    async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError> {
        let id = window_arg(&args, "win_id")?;
        let captured = self.0.capture_page(id).await?;
        let encoded = BASE64.encode(&captured.bytes);
        Ok(ResultEnvelope::success(vec![
            ContentBlock::text(format!("Screenshot of window {id}")),
            ContentBlock::image(encoded, captured.mime_type),
        ]))
    }
}

/// `send_input`: delivers a click or typed text to a window.
struct SendInput(Arc<dyn AutomationHost>);

#[async_trait]
impl ToolHandler for SendInput {
    async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError> {
        let kind = text_arg(&args, "kind")?;
        let id = window_arg(&args, "win_id")?;
        let event = match kind.as_str() {
            "click" => {
                let x = args.get("x").and_then(Value::as_f64).ok_or_else(|| {
                    HandlerError::new("click input requires numeric `x` and `y`")
                })?;
                let y = args.get("y").and_then(Value::as_f64).ok_or_else(|| {
                    HandlerError::new("click input requires numeric `x` and `y`")
                })?;
                InputEvent::Click { x, y }
            }
            "type" => {
                let text = text_arg(&args, "text")
                    .map_err(|_| HandlerError::new("type input requires `text`"))?;
                InputEvent::Type { text }
            }
            other => {
                return Err(HandlerError::new(format!(
                    "unsupported input kind: {other}"
                )));
            }
        };
        self.0.send_input(id, event).await?;
        Ok(ResultEnvelope::text(format!(
            "Delivered {kind} input to window {id}"
        )))
    }
}

// ============================================================================
// SECTION: System Tools
// ============================================================================

/// `ping`: liveness check.
struct Ping;

#[async_trait]
impl ToolHandler for Ping {
    async fn call(&self, _args: Value) -> Result<ResultEnvelope, HandlerError> {
        Ok(ResultEnvelope::text("pong"))
    }
}

/// `echo`: returns its argument verbatim.
struct Echo;

#[async_trait]
impl ToolHandler for Echo {
    async fn call(&self, args: Value) -> Result<ResultEnvelope, HandlerError> {
        let text = text_arg(&args, "text")?;
        Ok(ResultEnvelope::text(text))
    }
}

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Registers the full built-in catalog against a host.
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] if any catalog name is already
/// registered, leaving earlier registrations intact.
pub fn register_catalog(
    registry: &mut ToolRegistry,
    host: Arc<dyn AutomationHost>,
) -> Result<(), RegistryError> {
    registry.register(
        ToolSpec::new(
            "open_window",
            "Open a new window navigated to a URL",
            ParamSpec::new()
                .required("url", FieldKind::Text, "URL to open")
                .optional("options", FieldKind::Object, "Window options"),
        )
        .tagged("Window"),
        Arc::new(OpenWindow(Arc::clone(&host))),
    )?;
    registry.register(
        ToolSpec::new(
            "get_windows",
            "List all live windows with their URLs and titles",
            ParamSpec::new(),
        )
        .tagged("Window"),
        Arc::new(GetWindows(Arc::clone(&host))),
    )?;
    registry.register(
        ToolSpec::new(
            "close_window",
            "Close a window by id",
            ParamSpec::new().required("win_id", FieldKind::Integer, "Window id to close"),
        )
        .tagged("Window"),
        Arc::new(CloseWindow(Arc::clone(&host))),
    )?;
    registry.register(
        ToolSpec::new(
            "load_url",
            "Navigate an existing window to a URL",
            ParamSpec::new()
                .required("url", FieldKind::Text, "URL to load")
                .with_default("win_id", FieldKind::Integer, json!(1), "Target window id"),
        )
        .tagged("Window"),
        Arc::new(LoadUrl(Arc::clone(&host))),
    )?;
    registry.register(
        ToolSpec::new(
            "get_title",
            "Read the page title of a window",
            ParamSpec::new().required("win_id", FieldKind::Integer, "Window id"),
        )
        .tagged("Window"),
        Arc::new(GetTitle(Arc::clone(&host))),
    )?;
    registry.register(
        ToolSpec::new(
            "exec_js",
            "Execute JavaScript in a window's page and return the result",
            ParamSpec::new()
                .required("code", FieldKind::Text, "JavaScript to execute")
                .with_default("win_id", FieldKind::Integer, json!(1), "Target window id"),
        )
        .tagged("Page"),
        Arc::new(ExecJs(Arc::clone(&host))),
    )?;
    registry.register(
        ToolSpec::new(
            "screenshot",
            "Capture a window's page as an image",
            ParamSpec::new().with_default(
                "win_id",
                FieldKind::Integer,
                json!(1),
                "Target window id",
            ),
        )
        .tagged("Page"),
        Arc::new(Screenshot(Arc::clone(&host))),
    )?;
    registry.register(
        ToolSpec::new(
            "send_input",
            "Send a synthetic click or typed text to a window",
            ParamSpec::new()
                .required("kind", FieldKind::Text, "Input kind: click or type")
                .with_default("win_id", FieldKind::Integer, json!(1), "Target window id")
                .optional("x", FieldKind::Number, "Click x coordinate")
                .optional("y", FieldKind::Number, "Click y coordinate")
                .optional("text", FieldKind::Text, "Text to type"),
        )
        .tagged("Page"),
        Arc::new(SendInput(Arc::clone(&host))),
    )?;
    registry.register(
        ToolSpec::new("ping", "Liveness check", ParamSpec::new()).tagged("System"),
        Arc::new(Ping),
    )?;
    registry.register(
        ToolSpec::new(
            "echo",
            "Return the given text verbatim",
            ParamSpec::new().required("text", FieldKind::Text, "Text to echo"),
        )
        .tagged("System"),
        Arc::new(Echo),
    )?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
