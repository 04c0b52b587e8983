// crates/shellbridge-server/src/config.rs
// ============================================================================
// Module: Server Configuration
// Description: TOML-loadable configuration for the bridge server.
// Purpose: Centralize bind, body-limit, auth, and OpenAPI settings.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration model for the bridge server. Loaded from a TOML file or
//! built programmatically; every field has a serde default so a missing file
//! section falls back to safe local-only behavior. Validation is fail-closed:
//! a non-loopback bind without an explicit auth policy is rejected rather
//! than warned about.
//!
//! ## Invariants
//! - `validate` passes before any transport binds.
//! - Bearer mode requires at least one token source (inline or token file).

use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default bind address for the HTTP listener.
pub const DEFAULT_BIND: &str = "127.0.0.1:8101";

/// Maximum accepted configuration file size.
const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default OpenAPI document title.
fn default_openapi_title() -> String {
    "Shellbridge RPC".to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML syntax or shape failure.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Semantically invalid configuration.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Authentication mode for inbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Loopback peers only; no credentials required.
    #[default]
    LocalOnly,
    /// Bearer token via header or query fallback.
    BearerToken,
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Authentication mode.
    #[serde(default)]
    pub mode: AuthMode,
    /// Path to a persisted token file read at startup.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    /// Inline bearer tokens accepted in addition to the token file.
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
}

/// OpenAPI document settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenApiConfig {
    /// Document title.
    #[serde(default = "default_openapi_title")]
    pub title: String,
    /// Advertised server URL; defaults to the bind address.
    #[serde(default)]
    pub server_url: Option<String>,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            title: default_openapi_title(),
            server_url: None,
        }
    }
}

/// Bridge server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// OpenAPI document settings.
    #[serde(default)]
    pub openapi: OpenApiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            auth: AuthConfig::default(),
            openapi: OpenApiConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        let addr = self.bind_addr()?;
        match self.auth.mode {
            AuthMode::LocalOnly => {
                if !addr.ip().is_loopback() {
                    return Err(ConfigError::Invalid(
                        "non-loopback bind disallowed without auth policy".to_string(),
                    ));
                }
            }
            AuthMode::BearerToken => {
                if self.auth.bearer_tokens.is_empty() && self.auth.token_file.is_none() {
                    return Err(ConfigError::Invalid(
                        "bearer_token mode requires bearer_tokens or token_file".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Parses the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the bind address is malformed.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Returns true when the server accepts loopback peers without credentials.
    #[must_use]
    pub const fn is_local_only(&self) -> bool {
        matches!(self.auth.mode, AuthMode::LocalOnly)
    }

    /// Returns the URL advertised in the OpenAPI document.
    #[must_use]
    pub fn advertised_url(&self) -> String {
        self.openapi
            .server_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.bind))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
