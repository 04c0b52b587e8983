// crates/shellbridge-server/src/audit.rs
// ============================================================================
// Module: Audit and Telemetry
// Description: Structured audit events and metrics hooks for the server.
// Purpose: Emit JSON-line audit logs and counters without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are JSON lines written through an [`AuditSink`]; the default
//! sink writes to stderr so deployments can route them into any logging
//! pipeline. Metrics go through the dependency-light [`ServerMetrics`] trait
//! so a Prometheus or OpenTelemetry backend can be plugged in without
//! touching the transports. Both default to no-op in tests.

use std::io::Write;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::auth::AuthAuditEvent;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Transport a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// SSE session transport.
    Session,
    /// Stateless RPC transport.
    Rpc,
}

impl TransportKind {
    /// Returns a stable label for the transport.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Rpc => "rpc",
        }
    }
}

/// Request outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// Envelope returned with `isError = false`.
    Ok,
    /// Envelope returned with `isError = true`.
    Error,
}

impl CallOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Tool call audit payload.
#[derive(Debug, Serialize)]
pub struct CallAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    timestamp_ms: u128,
    /// Transport used for the call.
    transport: TransportKind,
    /// Session identifier (session transport only).
    session_id: Option<String>,
    /// Invoked tool name as requested by the caller.
    tool: String,
    /// Envelope-level outcome.
    outcome: CallOutcome,
    /// Handler wall time in milliseconds.
    duration_ms: u128,
    /// Request identifier when provided.
    request_id: Option<String>,
}

impl CallAuditEvent {
    /// Builds a tool call event with a consistent timestamp.
    #[must_use]
    pub fn new(
        transport: TransportKind,
        session_id: Option<String>,
        tool: impl Into<String>,
        outcome: CallOutcome,
        duration: Duration,
        request_id: Option<String>,
    ) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "tool_call",
            timestamp_ms,
            transport,
            session_id,
            tool: tool.into(),
            outcome,
            duration_ms: duration.as_millis(),
            request_id,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for auth decisions and tool calls.
pub trait AuditSink: Send + Sync {
    /// Records an auth decision.
    fn record_auth(&self, event: &AuthAuditEvent);

    /// Records a tool call.
    fn record_call(&self, event: &CallAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_auth(&self, event: &AuthAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_call(&self, event: &CallAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// No-op audit sink for tests and embedding.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_auth(&self, _event: &AuthAuditEvent) {}

    fn record_call(&self, _event: &CallAuditEvent) {}
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Default latency buckets in milliseconds for request histograms.
pub const LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 30_000];

/// Request metric event payload.
#[derive(Debug, Clone)]
pub struct MetricEvent {
    /// Transport used for the request.
    pub transport: TransportKind,
    /// Tool name when available.
    pub tool: Option<String>,
    /// Request outcome.
    pub outcome: CallOutcome,
}

/// Metrics sink for request counters and latencies.
pub trait ServerMetrics: Send + Sync {
    /// Records a request counter event.
    fn record_request(&self, event: MetricEvent);

    /// Records a latency observation for the request.
    fn record_latency(&self, event: MetricEvent, latency: Duration);
}

/// No-op metrics sink.
pub struct NoopMetrics;

impl ServerMetrics for NoopMetrics {
    fn record_request(&self, _event: MetricEvent) {}

    fn record_latency(&self, _event: MetricEvent, _latency: Duration) {}
}
