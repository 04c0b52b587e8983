// crates/shellbridge-server/src/server.rs
// ============================================================================
// Module: Bridge Server
// Description: Axum assembly of the SSE session and stateless RPC transports.
// Purpose: Expose registered tools over HTTP with a shared auth gate.
// Dependencies: shellbridge-core, axum, tokio
// ============================================================================

//! ## Overview
//! The bridge server mounts two transports over one frozen registry: the SSE
//! session protocol (`GET /mcp` + `POST /messages`) and the stateless RPC
//! surface (`/rpc/*`), plus unauthenticated discovery routes (`/openapi.json`,
//! `/ping`). Every authenticated route passes the auth gate before the body
//! is parsed. Tool-level failures never change the HTTP status of the RPC
//! surface; only auth (401), transport (400/413), and resolution (404)
//! failures do.
//!
//! ## Invariants
//! - Both transports share one [`Dispatcher`]; validation and envelope
//!   semantics are identical for identical payloads.
//! - The OpenAPI document is generated once at startup and served cached.
//! - Accepted session messages return 202; responses arrive on the stream
//!   in request order per session.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::io::Write;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use shellbridge_core::Dispatcher;
use shellbridge_core::ToolRegistry;

use crate::audit::AuditSink;
use crate::audit::CallAuditEvent;
use crate::audit::CallOutcome;
use crate::audit::MetricEvent;
use crate::audit::NoopMetrics;
use crate::audit::ServerMetrics;
use crate::audit::StderrAuditSink;
use crate::audit::TransportKind;
use crate::auth::AuthAuditEvent;
use crate::auth::AuthGate;
use crate::auth::RequestContext;
use crate::config::ServerConfig;
use crate::jsonrpc;
use crate::jsonrpc::JsonRpcRequest;
use crate::openapi::openapi_document;
use crate::session::OpenSession;
use crate::session::Session;
use crate::session::SessionGuard;
use crate::session::SessionManager;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server construction and serving errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid or unusable configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Transport-level failure (bind or serve).
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server State
// ============================================================================

/// Shared state for all route handlers.
struct ServerState {
    /// Shared invocation path over the frozen registry.
    dispatcher: Dispatcher,
    /// Open session registry.
    sessions: Arc<SessionManager>,
    /// Auth policy applied before dispatch.
    auth: AuthGate,
    /// Audit sink for auth decisions and tool calls.
    audit: Arc<dyn AuditSink>,
    /// Metrics sink for request counters and latencies.
    metrics: Arc<dyn ServerMetrics>,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
    /// OpenAPI document generated at startup.
    openapi: Value,
}

impl ServerState {
    /// Copies the state with replacement sinks.
    fn rebuilt(&self, audit: Arc<dyn AuditSink>, metrics: Arc<dyn ServerMetrics>) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            sessions: Arc::clone(&self.sessions),
            auth: self.auth.clone(),
            audit,
            metrics,
            max_body_bytes: self.max_body_bytes,
            openapi: self.openapi.clone(),
        }
    }
}

/// Bridge server instance.
pub struct BridgeServer {
    /// Validated configuration.
    config: ServerConfig,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl BridgeServer {
    /// Builds a server over a frozen registry.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the configuration fails
    /// validation or the configured token file cannot be read.
    pub fn new(config: ServerConfig, registry: ToolRegistry) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let file_tokens = match &config.auth.token_file {
            Some(path) => load_token_file(path)?,
            None => Vec::new(),
        };
        let auth = AuthGate::from_config(&config.auth, file_tokens);
        let registry = Arc::new(registry);
        let openapi =
            openapi_document(&registry, &config.openapi, &config.advertised_url());
        emit_local_only_warning(&config);
        let state = Arc::new(ServerState {
            dispatcher: Dispatcher::new(registry),
            sessions: Arc::new(SessionManager::new()),
            auth,
            audit: Arc::new(StderrAuditSink),
            metrics: Arc::new(NoopMetrics),
            max_body_bytes: config.max_body_bytes,
            openapi,
        });
        Ok(Self {
            config,
            state,
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        let metrics = Arc::clone(&self.state.metrics);
        self.state = Arc::new(self.state.rebuilt(audit, metrics));
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn ServerMetrics>) -> Self {
        let audit = Arc::clone(&self.state.audit);
        self.state = Arc::new(self.state.rebuilt(audit, metrics));
        self
    }

    /// Serves requests on the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self
            .config
            .bind_addr()
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        self.serve_on(listener).await
    }

    /// Serves requests on an already-bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the server fails.
    pub async fn serve_on(self, listener: tokio::net::TcpListener) -> Result<(), ServerError> {
        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }

    /// Builds the route table over the shared state.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/mcp", get(handle_mcp_stream))
            .route("/messages", post(handle_session_message))
            .route("/rpc/tools", get(handle_list_tools))
            .route("/rpc/schemas", get(handle_list_schemas))
            .route("/rpc", post(handle_rpc_call))
            .route("/rpc/{tool}", post(handle_rpc_tool_call))
            .route("/openapi.json", get(handle_openapi))
            .route("/ping", get(handle_ping))
            .layer(DefaultBodyLimit::max(self.state.max_body_bytes))
            .with_state(Arc::clone(&self.state))
    }
}

/// Reads accepted tokens from the persisted token file, one per line.
fn load_token_file(path: &std::path::Path) -> Result<Vec<String>, ServerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| ServerError::Config(format!("token file unreadable: {err}")))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn emit_local_only_warning(config: &ServerConfig) {
    if config.is_local_only() {
        let _ = writeln!(
            std::io::stderr(),
            "shellbridge: WARNING: server running in local-only mode without explicit auth; \
             configure auth.mode = \"bearer_token\" before binding beyond loopback"
        );
    }
}

// ============================================================================
// SECTION: Auth Plumbing
// ============================================================================

/// Query parameters accepted on authenticated routes.
#[derive(Debug, Deserialize)]
struct AuthQuery {
    /// Bearer token fallback.
    token: Option<String>,
}

/// Query parameters for the session message route.
#[derive(Debug, Deserialize)]
struct MessagesQuery {
    /// Target session identifier.
    #[serde(rename = "sessionId")]
    session_id: String,
    /// Bearer token fallback.
    token: Option<String>,
}

/// Runs the auth gate for one request and records the decision.
fn authorize_request(
    state: &ServerState,
    peer: SocketAddr,
    headers: &HeaderMap,
    query_token: Option<String>,
) -> Result<(), Response> {
    let auth_header =
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    let ctx = RequestContext::http(Some(peer.ip()), auth_header, query_token);
    match state.auth.authorize(&ctx) {
        Ok(auth) => {
            state.audit.record_auth(&AuthAuditEvent::allowed(&ctx, &auth));
            Ok(())
        }
        Err(err) => {
            state.audit.record_auth(&AuthAuditEvent::denied(&ctx, &err));
            Err(json_response(StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })))
        }
    }
}

/// Builds a JSON response with an explicit status.
fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

// ============================================================================
// SECTION: Session Transport
// ============================================================================

/// Stream adapter that closes the session when the connection drops.
struct SessionStream<S> {
    /// Underlying event stream.
    inner: S,
    /// Removes the session from the manager on drop.
    _guard: SessionGuard,
}

impl<S> Stream for SessionStream<S>
where
    S: Stream + Unpin,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Opens an SSE session stream.
///
/// The first event is `endpoint` carrying the message posting URL for this
/// session; subsequent `message` events carry JSON-RPC responses.
async fn handle_mcp_stream(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorize_request(&state, peer, &headers, query.token) {
        return denied;
    }
    let (session, payloads, guard) = open_session(&state);
    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={}", session.id()));
    let responses = ReceiverStream::new(payloads)
        .map(|payload| Ok::<Event, Infallible>(Event::default().event("message").data(payload)));
    let stream = SessionStream {
        inner: tokio_stream::once(Ok(endpoint)).chain(responses),
        _guard: guard,
    };
    Sse::new(stream).into_response()
}

/// Opens a session and starts its worker task.
///
/// The worker drains the session's request queue one request at a time, so
/// responses leave in the order requests were accepted by the transport.
fn open_session(
    state: &Arc<ServerState>,
) -> (Arc<Session>, mpsc::Receiver<String>, SessionGuard) {
    let OpenSession {
        session,
        payloads,
        work,
        guard,
    } = SessionManager::open(&state.sessions);
    let worker_state = Arc::clone(state);
    let worker_session = Arc::clone(&session);
    tokio::spawn(run_session_worker(worker_state, worker_session, work));
    (session, payloads, guard)
}

/// Dispatches queued session requests until the queue or stream closes.
async fn run_session_worker(
    state: Arc<ServerState>,
    session: Arc<Session>,
    mut work: mpsc::Receiver<JsonRpcRequest>,
) {
    while let Some(request) = work.recv().await {
        let tool = (request.method == "tools/call")
            .then(|| {
                request
                    .params
                    .as_ref()
                    .and_then(|params| params.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .flatten();
        let request_id = Some(request.id.to_string());
        let started = Instant::now();
        let response = jsonrpc::handle_request(&state.dispatcher, request).await;
        record_call(
            &state,
            TransportKind::Session,
            Some(session.id().to_string()),
            tool,
            request_id,
            response
                .result
                .as_ref()
                .and_then(|result| result.get("isError"))
                .and_then(Value::as_bool)
                .unwrap_or(response.error.is_some()),
            started,
        );
        let Ok(payload) = serde_json::to_string(&response) else {
            continue;
        };
        if session.send(payload).await.is_err() {
            break;
        }
    }
}

/// Accepts one JSON-RPC message for an open session.
async fn handle_session_message(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<MessagesQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(denied) = authorize_request(&state, peer, &headers, query.token) {
        return denied;
    }
    if body.len() > state.max_body_bytes {
        return json_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "error": "Request body too large" }),
        );
    }
    let Ok(request) = serde_json::from_slice::<JsonRpcRequest>(&body) else {
        return json_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Invalid JSON-RPC payload" }),
        );
    };
    let Some(session) = state.sessions.lookup(&query.session_id) else {
        return json_response(
            StatusCode::NOT_FOUND,
            json!({ "error": format!("Unknown session: {}", query.session_id) }),
        );
    };
    // Enqueued before 202: queue position fixes the response order.
    if session.enqueue(request).await.is_err() {
        return json_response(
            StatusCode::NOT_FOUND,
            json!({ "error": format!("Unknown session: {}", query.session_id) }),
        );
    }
    StatusCode::ACCEPTED.into_response()
}

// ============================================================================
// SECTION: Stateless RPC Transport
// ============================================================================

/// Tool call envelope for the stateless transport.
#[derive(Debug, Deserialize)]
struct CallEnvelope {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Lists registered tools.
async fn handle_list_tools(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorize_request(&state, peer, &headers, query.token) {
        return denied;
    }
    json_response(StatusCode::OK, json!({ "tools": state.dispatcher.registry().list() }))
}

/// Lists derived input schemas keyed by tool name.
async fn handle_list_schemas(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorize_request(&state, peer, &headers, query.token) {
        return denied;
    }
    let mut schemas = serde_json::Map::new();
    for definition in state.dispatcher.registry().list() {
        schemas.insert(definition.name.clone(), definition.input_schema.to_value());
    }
    json_response(StatusCode::OK, json!({ "schemas": Value::Object(schemas) }))
}

/// Invokes a tool via the generic `{name, arguments}` envelope.
async fn handle_rpc_call(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(denied) = authorize_request(&state, peer, &headers, query.token) {
        return denied;
    }
    if body.len() > state.max_body_bytes {
        return json_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "error": "Request body too large" }),
        );
    }
    let Ok(call) = serde_json::from_slice::<CallEnvelope>(&body) else {
        return json_response(StatusCode::BAD_REQUEST, json!({ "error": "Invalid request body" }));
    };
    invoke_rest(&state, &call.name, call.arguments).await
}

/// Invokes a tool via its dedicated path with raw arguments as body.
async fn handle_rpc_tool_call(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(tool): Path<String>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(denied) = authorize_request(&state, peer, &headers, query.token) {
        return denied;
    }
    if body.len() > state.max_body_bytes {
        return json_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            json!({ "error": "Request body too large" }),
        );
    }
    let arguments = if body.is_empty() {
        Value::Null
    } else {
        let Ok(parsed) = serde_json::from_slice::<Value>(&body) else {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid request body" }),
            );
        };
        parsed
    };
    invoke_rest(&state, &tool, arguments).await
}

/// Shared stateless invocation path: 404 for unknown tools, 200 envelopes
/// regardless of tool-level success.
async fn invoke_rest(state: &ServerState, name: &str, arguments: Value) -> Response {
    if state.dispatcher.registry().resolve(name).is_none() {
        return json_response(
            StatusCode::NOT_FOUND,
            json!({ "error": format!("Unknown tool: {name}") }),
        );
    }
    let started = Instant::now();
    let envelope = state.dispatcher.invoke(name, arguments).await;
    record_call(
        state,
        TransportKind::Rpc,
        None,
        Some(name.to_string()),
        None,
        envelope.is_error,
        started,
    );
    match serde_json::to_value(&envelope) {
        Ok(value) => json_response(StatusCode::OK, value),
        Err(err) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": err.to_string() }),
        ),
    }
}

/// Records audit and metrics for one tool call.
fn record_call(
    state: &ServerState,
    transport: TransportKind,
    session_id: Option<String>,
    tool: Option<String>,
    request_id: Option<String>,
    is_error: bool,
    started: Instant,
) {
    let outcome = if is_error { CallOutcome::Error } else { CallOutcome::Ok };
    let elapsed = started.elapsed();
    if let Some(tool) = tool {
        state.audit.record_call(&CallAuditEvent::new(
            transport,
            session_id,
            tool.clone(),
            outcome,
            elapsed,
            request_id,
        ));
        let event = MetricEvent {
            transport,
            tool: Some(tool),
            outcome,
        };
        state.metrics.record_request(event.clone());
        state.metrics.record_latency(event, elapsed);
    }
}

// ============================================================================
// SECTION: Discovery Routes
// ============================================================================

/// Serves the startup-generated OpenAPI document. Unauthenticated.
async fn handle_openapi(State(state): State<Arc<ServerState>>) -> Response {
    json_response(StatusCode::OK, state.openapi.clone())
}

/// Health check. Unauthenticated.
async fn handle_ping() -> Response {
    let ts = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    json_response(StatusCode::OK, json!({ "ping": "pong", "ts": ts }))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
