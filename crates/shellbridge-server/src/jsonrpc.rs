// crates/shellbridge-server/src/jsonrpc.rs
// ============================================================================
// Module: JSON-RPC Handling
// Description: JSON-RPC 2.0 envelopes and method handling for sessions.
// Purpose: Resolve tools/list and tools/call to registry and dispatcher.
// Dependencies: shellbridge-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The session transport speaks JSON-RPC 2.0. Supported methods are
//! `tools/list` and `tools/call`; everything else yields a `-32601` error
//! response correlated by the request id. Tool-level failures are not
//! JSON-RPC errors: a `tools/call` whose tool fails still produces a
//! `result` carrying the error envelope, so the error taxonomy matches the
//! stateless transport exactly.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use shellbridge_core::Dispatcher;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Invalid JSON-RPC request (bad version or malformed frame).
pub const INVALID_REQUEST: i64 = -32600;
/// Unsupported method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Malformed method parameters.
pub const INVALID_PARAMS: i64 = -32602;

// ============================================================================
// SECTION: Envelopes
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    pub jsonrpc: String,
    /// Request identifier echoed in the response.
    #[serde(default)]
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Optional parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

/// Parameters for `tools/call`.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Tool name.
    pub name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    pub arguments: Value,
}

impl JsonRpcResponse {
    /// Builds a success response.
    #[must_use]
    pub const fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

// ============================================================================
// SECTION: Method Handling
// ============================================================================

/// Tool list result payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions in registration order.
    tools: Vec<shellbridge_core::ToolDefinition>,
}

/// Handles one JSON-RPC request against the shared dispatcher.
pub async fn handle_request(dispatcher: &Dispatcher, request: JsonRpcRequest) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::error(request.id, INVALID_REQUEST, "invalid json-rpc version");
    }
    match request.method.as_str() {
        "tools/list" => {
            let tools = dispatcher.registry().list();
            match serde_json::to_value(ToolListResult {
                tools,
            }) {
                Ok(value) => JsonRpcResponse::success(request.id, value),
                Err(err) => JsonRpcResponse::error(request.id, INVALID_REQUEST, err.to_string()),
            }
        }
        "tools/call" => {
            let id = request.id;
            let params = request.params.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => {
                    let envelope = dispatcher.invoke(&call.name, call.arguments).await;
                    match serde_json::to_value(envelope) {
                        Ok(value) => JsonRpcResponse::success(id, value),
                        Err(err) => JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string()),
                    }
                }
                Err(_) => JsonRpcResponse::error(id, INVALID_PARAMS, "invalid tool params"),
            }
        }
        _ => JsonRpcResponse::error(request.id, METHOD_NOT_FOUND, "method not found"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
