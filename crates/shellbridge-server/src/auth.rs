// crates/shellbridge-server/src/auth.rs
// ============================================================================
// Module: Auth Gate
// Description: Fail-closed authentication for inbound HTTP requests.
// Purpose: Decide local-only and bearer-token access before any dispatch.
// Dependencies: serde, sha2, subtle
// ============================================================================

//! ## Overview
//! Every route except the health check and the OpenAPI document passes this
//! gate before a request body is even parsed. Two modes exist: `local-only`
//! admits loopback peers without credentials, `bearer-token` requires a token
//! from the `Authorization` header or the `?token=` query fallback. Token
//! comparison is constant-time; audit events carry a sha256 fingerprint of
//! the presented token, never the token itself. All decisions are fail-closed.

use std::net::IpAddr;

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::config::AuthMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted `Authorization` header length.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context used for auth decisions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// `Authorization` header value.
    pub auth_header: Option<String>,
    /// `?token=` query parameter value.
    pub query_token: Option<String>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds an HTTP request context.
    #[must_use]
    pub const fn http(
        peer_ip: Option<IpAddr>,
        auth_header: Option<String>,
        query_token: Option<String>,
    ) -> Self {
        Self {
            peer_ip,
            auth_header,
            query_token,
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns true when the peer IP is loopback.
    #[must_use]
    pub fn peer_is_loopback(&self) -> bool {
        self.peer_ip.is_some_and(|ip| ip.is_loopback())
    }
}

// ============================================================================
// SECTION: Auth Context and Errors
// ============================================================================

/// Authentication method used for an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Loopback access without credentials.
    Local,
    /// Bearer token authentication.
    BearerToken,
}

impl AuthMethod {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::BearerToken => "bearer_token",
        }
    }
}

/// Authenticated caller context.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authentication method.
    pub method: AuthMethod,
    /// Subject label when known.
    pub subject: Option<String>,
    /// Sha256 fingerprint of the presented token (bearer mode only).
    pub token_fingerprint: Option<String>,
}

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

// ============================================================================
// SECTION: Auth Gate
// ============================================================================

/// Authentication policy derived from server configuration.
#[derive(Clone)]
pub struct AuthGate {
    /// Configured mode.
    mode: AuthMode,
    /// Accepted bearer tokens (config plus token file).
    tokens: Vec<String>,
}

impl AuthGate {
    /// Builds the gate from config plus tokens loaded from the token file.
    #[must_use]
    pub fn from_config(config: &AuthConfig, file_tokens: Vec<String>) -> Self {
        let mut tokens = config.bearer_tokens.clone();
        tokens.extend(file_tokens);
        Self {
            mode: config.mode,
            tokens,
        }
    }

    /// Returns the configured auth mode.
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Authorizes one request.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when the peer or credentials
    /// fail the configured policy.
    pub fn authorize(&self, ctx: &RequestContext) -> Result<AuthContext, AuthError> {
        match self.mode {
            AuthMode::LocalOnly => authorize_local_only(ctx),
            AuthMode::BearerToken => authorize_bearer(ctx, &self.tokens),
        }
    }
}

fn authorize_local_only(ctx: &RequestContext) -> Result<AuthContext, AuthError> {
    if ctx.peer_is_loopback() {
        Ok(AuthContext {
            method: AuthMethod::Local,
            subject: Some("loopback".to_string()),
            token_fingerprint: None,
        })
    } else {
        Err(AuthError::Unauthenticated(
            "local-only mode requires loopback access".to_string(),
        ))
    }
}

fn authorize_bearer(ctx: &RequestContext, tokens: &[String]) -> Result<AuthContext, AuthError> {
    let presented = presented_token(ctx)?;
    let valid = tokens
        .iter()
        .any(|token| constant_time_token_eq(token.as_bytes(), presented.as_bytes()));
    if !valid {
        return Err(AuthError::Unauthenticated("invalid bearer token".to_string()));
    }
    Ok(AuthContext {
        method: AuthMethod::BearerToken,
        subject: None,
        token_fingerprint: Some(token_fingerprint(&presented)),
    })
}

/// Extracts the presented token from the header or the query fallback.
fn presented_token(ctx: &RequestContext) -> Result<String, AuthError> {
    if let Some(header) = ctx.auth_header.as_deref() {
        return parse_bearer_token(header);
    }
    if let Some(token) = ctx.query_token.as_deref() {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Unauthenticated("empty token parameter".to_string()));
        }
        return Ok(token.to_string());
    }
    Err(AuthError::Unauthenticated("missing authorization".to_string()))
}

fn parse_bearer_token(header: &str) -> Result<String, AuthError> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

/// Compares tokens without early exit on the first mismatching byte.
fn constant_time_token_eq(expected: &[u8], presented: &[u8]) -> bool {
    if expected.len() != presented.len() {
        return false;
    }
    expected.ct_eq(presented).into()
}

/// Returns the lowercase hex sha256 of a token for audit labeling.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    use std::fmt::Write as _;
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Auth decision audit payload.
#[derive(Debug, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Caller IP address when available.
    peer_ip: Option<String>,
    /// Auth method label (allow events only).
    auth_method: Option<&'static str>,
    /// Caller subject when known.
    subject: Option<String>,
    /// Bearer token fingerprint (sha256).
    token_fingerprint: Option<String>,
    /// Failure reason (deny events only).
    reason: Option<String>,
    /// Request identifier when provided.
    request_id: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(ctx: &RequestContext, auth: &AuthContext) -> Self {
        Self {
            event: "auth_decision",
            decision: "allow",
            peer_ip: ctx.peer_ip.map(|ip| ip.to_string()),
            auth_method: Some(auth.method.label()),
            subject: auth.subject.clone(),
            token_fingerprint: auth.token_fingerprint.clone(),
            reason: None,
            request_id: ctx.request_id.clone(),
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(ctx: &RequestContext, error: &AuthError) -> Self {
        Self {
            event: "auth_decision",
            decision: "deny",
            peer_ip: ctx.peer_ip.map(|ip| ip.to_string()),
            auth_method: None,
            subject: None,
            token_fingerprint: None,
            reason: Some(error.to_string()),
            request_id: ctx.request_id.clone(),
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
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use std::net::IpAddr;
    use std::net::Ipv4Addr;

    use super::AuthGate;
    use super::AuthMethod;
    use super::RequestContext;
    use super::token_fingerprint;
    use crate::config::AuthConfig;
    use crate::config::AuthMode;

    const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    const REMOTE: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));

    fn bearer_gate(tokens: &[&str]) -> AuthGate {
        let config = AuthConfig {
            mode: AuthMode::BearerToken,
            token_file: None,
            bearer_tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
        };
        AuthGate::from_config(&config, Vec::new())
    }

    #[test]
    fn local_only_admits_loopback_and_rejects_remote() {
        let gate = AuthGate::from_config(&AuthConfig::default(), Vec::new());
        let allowed = gate
            .authorize(&RequestContext::http(Some(LOOPBACK), None, None))
            .expect("loopback admitted");
        assert_eq!(allowed.method, AuthMethod::Local);
        assert!(gate.authorize(&RequestContext::http(Some(REMOTE), None, None)).is_err());
        // Missing peer information fails closed.
        assert!(gate.authorize(&RequestContext::http(None, None, None)).is_err());
    }

    #[test]
    fn bearer_header_is_accepted_case_insensitively() {
        let gate = bearer_gate(&["secret-token"]);
        let ctx = RequestContext::http(
            Some(REMOTE),
            Some("bearer secret-token".to_string()),
            None,
        );
        let auth = gate.authorize(&ctx).expect("valid token admitted");
        assert_eq!(auth.method, AuthMethod::BearerToken);
        assert_eq!(
            auth.token_fingerprint.expect("fingerprint set"),
            token_fingerprint("secret-token")
        );
    }

    #[test]
    fn query_token_fallback_is_honored() {
        let gate = bearer_gate(&["secret-token"]);
        let ctx = RequestContext::http(Some(REMOTE), None, Some("secret-token".to_string()));
        gate.authorize(&ctx).expect("query token admitted");
    }

    #[test]
    fn header_takes_precedence_over_query_token() {
        let gate = bearer_gate(&["secret-token"]);
        let ctx = RequestContext::http(
            Some(REMOTE),
            Some("Bearer wrong".to_string()),
            Some("secret-token".to_string()),
        );
        assert!(gate.authorize(&ctx).is_err());
    }

    #[test]
    fn wrong_or_missing_tokens_are_rejected() {
        let gate = bearer_gate(&["secret-token"]);
        for ctx in [
            RequestContext::http(Some(REMOTE), Some("Bearer nope".to_string()), None),
            RequestContext::http(Some(REMOTE), Some("Basic abc".to_string()), None),
            RequestContext::http(Some(REMOTE), Some("Bearer ".to_string()), None),
            RequestContext::http(Some(REMOTE), None, Some("  ".to_string())),
            RequestContext::http(Some(REMOTE), None, None),
        ] {
            assert!(gate.authorize(&ctx).is_err());
        }
    }

    #[test]
    fn bearer_mode_does_not_admit_bare_loopback() {
        let gate = bearer_gate(&["secret-token"]);
        assert!(gate.authorize(&RequestContext::http(Some(LOOPBACK), None, None)).is_err());
    }
}
