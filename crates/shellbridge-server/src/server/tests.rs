// crates/shellbridge-server/src/server/tests.rs
// ============================================================================
// Module: Bridge Server Tests
// Description: Handler-level tests over an in-memory server fixture.
// Purpose: Verify transport status codes, auth gating, and session flow.
// Dependencies: shellbridge-tools, tokio
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "tests assert with panics by convention"
)]

use std::time::Duration;

use axum::http::HeaderValue;

use shellbridge_tools::SimulatedHost;
use shellbridge_tools::register_catalog;

use crate::audit::NoopAuditSink;
use crate::config::AuthConfig;
use crate::config::AuthMode;

use super::*;

/// Loopback peer used by most fixtures.
fn loopback_peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 41000))
}

/// Remote peer outside the loopback range.
fn remote_peer() -> SocketAddr {
    SocketAddr::from(([203, 0, 113, 9], 41000))
}

/// Builds server state over the simulated catalog with the given config.
fn fixture_with_config(config: ServerConfig) -> Arc<ServerState> {
    let mut registry = ToolRegistry::new();
    register_catalog(&mut registry, Arc::new(SimulatedHost::new()))
        .expect("catalog registers cleanly");
    let server = BridgeServer::new(config, registry)
        .expect("config is valid")
        .with_audit_sink(Arc::new(NoopAuditSink));
    Arc::clone(&server.state)
}

/// Builds server state with the default local-only config.
fn fixture() -> Arc<ServerState> {
    fixture_with_config(ServerConfig::default())
}

/// Builds server state requiring the given bearer token.
fn bearer_fixture(token: &str) -> Arc<ServerState> {
    let config = ServerConfig {
        auth: AuthConfig {
            mode: AuthMode::BearerToken,
            token_file: None,
            bearer_tokens: vec![token.to_string()],
        },
        ..ServerConfig::default()
    };
    fixture_with_config(config)
}

/// Decodes a handler response body as JSON.
async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// Query value carrying no token.
fn no_token() -> Query<AuthQuery> {
    Query(AuthQuery {
        token: None,
    })
}

#[tokio::test]
async fn ping_reports_pong_with_timestamp() {
    let response = handle_ping().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ping"], "pong");
    assert!(body["ts"].as_u64().is_some());
}

#[tokio::test]
async fn openapi_served_without_credentials() {
    let state = bearer_fixture("secret");
    let response = handle_openapi(State(state)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["openapi"], "3.0.3");
}

#[tokio::test]
async fn tools_listing_covers_the_catalog() {
    let state = fixture();
    let response = handle_list_tools(
        State(state),
        ConnectInfo(loopback_peer()),
        no_token(),
        HeaderMap::new(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let tools = body["tools"].as_array().expect("tools array");
    assert_eq!(tools.len(), 10);
    assert!(tools.iter().any(|tool| tool["name"] == "open_window"));
}

#[tokio::test]
async fn schema_listing_keys_by_tool_name() {
    let state = fixture();
    let response = handle_list_schemas(
        State(state),
        ConnectInfo(loopback_peer()),
        no_token(),
        HeaderMap::new(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["schemas"]["echo"]["type"], "object");
    assert_eq!(body["schemas"]["echo"]["required"][0], "text");
}

#[tokio::test]
async fn rpc_call_returns_envelope_with_ok_status() {
    let state = fixture();
    let body = Bytes::from(r#"{"name":"echo","arguments":{"text":"hi"}}"#);
    let response = handle_rpc_call(
        State(state),
        ConnectInfo(loopback_peer()),
        no_token(),
        HeaderMap::new(),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isError"], false);
    assert_eq!(body["content"][0]["text"], "hi");
}

#[tokio::test]
async fn rpc_tool_failure_keeps_http_ok() {
    let state = fixture();
    let body = Bytes::from(r#"{"name":"get_title","arguments":{"win_id":99}}"#);
    let response = handle_rpc_call(
        State(state),
        ConnectInfo(loopback_peer()),
        no_token(),
        HeaderMap::new(),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isError"], true);
    let text = body["content"][0]["text"].as_str().expect("text block");
    assert!(text.starts_with("Error: "), "{text}");
}

#[tokio::test]
async fn rpc_unknown_tool_is_not_found() {
    let state = fixture();
    let body = Bytes::from(r#"{"name":"warp_drive","arguments":{}}"#);
    let response = handle_rpc_call(
        State(state),
        ConnectInfo(loopback_peer()),
        no_token(),
        HeaderMap::new(),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unknown tool: warp_drive");
}

#[tokio::test]
async fn rpc_malformed_body_is_bad_request() {
    let state = fixture();
    let response = handle_rpc_call(
        State(state),
        ConnectInfo(loopback_peer()),
        no_token(),
        HeaderMap::new(),
        Bytes::from("not json"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rpc_oversized_body_is_rejected() {
    let config = ServerConfig {
        max_body_bytes: 16,
        ..ServerConfig::default()
    };
    let state = fixture_with_config(config);
    let body = Bytes::from(r#"{"name":"echo","arguments":{"text":"far too long"}}"#);
    let response = handle_rpc_call(
        State(state),
        ConnectInfo(loopback_peer()),
        no_token(),
        HeaderMap::new(),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn rpc_tool_path_accepts_empty_body() {
    let state = fixture();
    let response = handle_rpc_tool_call(
        State(state),
        ConnectInfo(loopback_peer()),
        Path("ping".to_string()),
        no_token(),
        HeaderMap::new(),
        Bytes::new(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["content"][0]["text"], "pong");
}

#[tokio::test]
async fn rpc_tool_path_rejects_unknown_tool() {
    let state = fixture();
    let response = handle_rpc_tool_call(
        State(state),
        ConnectInfo(loopback_peer()),
        Path("warp_drive".to_string()),
        no_token(),
        HeaderMap::new(),
        Bytes::new(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn local_only_rejects_remote_peers() {
    let state = fixture();
    let response = handle_list_tools(
        State(state),
        ConnectInfo(remote_peer()),
        no_token(),
        HeaderMap::new(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn bearer_mode_accepts_header_and_query_token() {
    let state = bearer_fixture("secret");

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
    let response =
        handle_list_tools(State(Arc::clone(&state)), ConnectInfo(remote_peer()), no_token(), headers)
            .await;
    assert_eq!(response.status(), StatusCode::OK);

    let query = Query(AuthQuery {
        token: Some("secret".to_string()),
    });
    let response =
        handle_list_tools(State(state), ConnectInfo(remote_peer()), query, HeaderMap::new()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bearer_mode_rejects_wrong_token() {
    let state = bearer_fixture("secret");
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
    let response =
        handle_list_tools(State(state), ConnectInfo(loopback_peer()), no_token(), headers).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Posts one session message and returns the handler response.
async fn post_session_message(
    state: &Arc<ServerState>,
    session_id: &str,
    payload: &str,
) -> Response {
    handle_session_message(
        State(Arc::clone(state)),
        ConnectInfo(loopback_peer()),
        Query(MessagesQuery {
            session_id: session_id.to_string(),
            token: None,
        }),
        HeaderMap::new(),
        Bytes::from(payload.to_string()),
    )
    .await
}

/// Receives the next session payload with a test-side deadline.
async fn recv_payload(rx: &mut tokio::sync::mpsc::Receiver<String>) -> Value {
    let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("response before deadline")
        .expect("channel open");
    serde_json::from_str(&payload).expect("payload is JSON")
}

#[tokio::test]
async fn session_message_is_accepted_and_answered() {
    let state = fixture();
    let (session, mut rx, _guard) = open_session(&state);

    let payload = r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#;
    let response = post_session_message(&state, session.id(), payload).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let answer = recv_payload(&mut rx).await;
    assert_eq!(answer["id"], 7);
    assert_eq!(answer["result"]["tools"].as_array().expect("tools").len(), 10);
}

#[tokio::test]
async fn session_responses_follow_request_order() {
    let state = fixture();
    let (session, mut rx, _guard) = open_session(&state);

    let first = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"ping"}}"#;
    let response = post_session_message(&state, session.id(), first).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let answer = recv_payload(&mut rx).await;
    assert_eq!(answer["id"], 1);
    assert_eq!(answer["result"]["content"][0]["text"], "pong");

    let second = r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"echo","arguments":{"text":"ok"}}}"#;
    let response = post_session_message(&state, session.id(), second).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let answer = recv_payload(&mut rx).await;
    assert_eq!(answer["id"], 2);
    assert_eq!(answer["result"]["content"][0]["text"], "ok");
}

#[tokio::test]
async fn pipelined_session_messages_answered_in_acceptance_order() {
    let state = fixture();
    let (session, mut rx, _guard) = open_session(&state);

    // All five accepted before any response is read.
    for id in 1..=5_i64 {
        let payload = format!(
            r#"{{"jsonrpc":"2.0","id":{id},"method":"tools/call","params":{{"name":"echo","arguments":{{"text":"m{id}"}}}}}}"#
        );
        let response = post_session_message(&state, session.id(), &payload).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
    for id in 1..=5_i64 {
        let answer = recv_payload(&mut rx).await;
        assert_eq!(answer["id"], id);
        assert_eq!(answer["result"]["content"][0]["text"], format!("m{id}"));
    }
}

#[tokio::test]
async fn session_tool_failure_stays_in_result_envelope() {
    let state = fixture();
    let (session, mut rx, _guard) = open_session(&state);

    let payload =
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"close_window","arguments":{"win_id":42}}}"#;
    let response = post_session_message(&state, session.id(), payload).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let answer = recv_payload(&mut rx).await;
    assert!(answer["error"].is_null());
    assert_eq!(answer["result"]["isError"], true);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let state = fixture();
    let payload = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
    let response = post_session_message(&state, "sess-missing", payload).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unknown session: sess-missing");
}

#[tokio::test]
async fn closing_one_session_leaves_others_usable() {
    let state = fixture();
    let (first, mut first_rx, _first_guard) = open_session(&state);
    let (second, _second_rx, second_guard) = open_session(&state);
    let second_id = second.id().to_string();
    drop(second_guard);

    let payload = r#"{"jsonrpc":"2.0","id":11,"method":"tools/call","params":{"name":"ping"}}"#;
    let response = post_session_message(&state, first.id(), payload).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let answer = recv_payload(&mut first_rx).await;
    assert_eq!(answer["id"], 11);
    assert_eq!(answer["result"]["content"][0]["text"], "pong");

    let response = post_session_message(&state, &second_id, payload).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_malformed_payload_is_bad_request() {
    let state = fixture();
    let (session, _rx, _guard) = open_session(&state);
    let response = post_session_message(&state, session.id(), "{nope").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn transports_agree_on_identical_payloads() {
    let state = fixture();

    let rest = handle_rpc_call(
        State(Arc::clone(&state)),
        ConnectInfo(loopback_peer()),
        no_token(),
        HeaderMap::new(),
        Bytes::from(r#"{"name":"echo","arguments":{"text":"same"}}"#),
    )
    .await;
    assert_eq!(rest.status(), StatusCode::OK);
    let rest_body = body_json(rest).await;

    let (session, mut rx, _guard) = open_session(&state);
    let payload =
        r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"echo","arguments":{"text":"same"}}}"#;
    let response = post_session_message(&state, session.id(), payload).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let answer = recv_payload(&mut rx).await;

    assert_eq!(answer["result"], rest_body);
}
