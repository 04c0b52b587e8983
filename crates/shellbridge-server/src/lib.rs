// crates/shellbridge-server/src/lib.rs
// ============================================================================
// Module: Shellbridge Server
// Description: HTTP transports, auth gate, and session layer for shellbridge.
// Purpose: Serve a frozen tool registry over SSE sessions and stateless RPC.
// Dependencies: shellbridge-core, axum, tokio
// ============================================================================

//! ## Overview
//! This crate hosts a [`shellbridge_core::ToolRegistry`] behind two HTTP
//! transports: the SSE session protocol (`GET /mcp` + `POST /messages`) and
//! the stateless RPC surface (`/rpc/*`). A single auth gate guards both. The
//! OpenAPI document and health check are served unauthenticated for
//! discovery.
//!
//! ## Invariants
//! - Both transports dispatch through one shared [`shellbridge_core::Dispatcher`].
//! - Authentication is decided before any request body is interpreted.
//! - Tool-level failures surface as result envelopes, never transport errors.

pub mod audit;
pub mod auth;
pub mod config;
pub mod jsonrpc;
pub mod openapi;
pub mod server;
pub mod session;

pub use audit::AuditSink;
pub use audit::CallAuditEvent;
pub use audit::CallOutcome;
pub use audit::MetricEvent;
pub use audit::NoopAuditSink;
pub use audit::NoopMetrics;
pub use audit::ServerMetrics;
pub use audit::StderrAuditSink;
pub use audit::TransportKind;
pub use auth::AuthContext;
pub use auth::AuthError;
pub use auth::AuthGate;
pub use auth::AuthMethod;
pub use auth::RequestContext;
pub use auth::token_fingerprint;
pub use config::AuthConfig;
pub use config::AuthMode;
pub use config::ConfigError;
pub use config::DEFAULT_BIND;
pub use config::OpenApiConfig;
pub use config::ServerConfig;
pub use jsonrpc::JsonRpcRequest;
pub use jsonrpc::JsonRpcResponse;
pub use openapi::openapi_document;
pub use server::BridgeServer;
pub use server::ServerError;
pub use session::SessionError;
pub use session::SessionManager;
