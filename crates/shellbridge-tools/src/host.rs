// crates/shellbridge-tools/src/host.rs
// ============================================================================
// Module: Automation Host
// Description: Collaborator trait for the window and page automation layer.
// Purpose: Decouple tool handlers from any concrete browser embedding.
// Dependencies: async-trait, thiserror
// ============================================================================

//! ## Overview
//! The tool catalog never talks to a browser directly. It talks to an
//! [`AutomationHost`], a trait over window lifecycle, navigation, script
//! execution, capture, and synthetic input. Real deployments implement the
//! trait over their embedding; development and tests use the deterministic
//! in-memory [`SimulatedHost`](crate::simulated::SimulatedHost).
//!
//! ## Invariants
//! - Window identifiers are assigned by the host, start at 1, and are never
//!   reused within a host's lifetime.
//! - Every operation on a missing window fails with
//!   [`AutomationError::WindowNotFound`] carrying the requested id.

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// SECTION: Identifiers and Results
// ============================================================================

/// Host-assigned window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of one live window as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Host-assigned identifier.
    pub id: WindowId,
    /// Current page URL.
    pub url: String,
    /// Current page title.
    pub title: String,
}

/// Captured page image returned by [`AutomationHost::capture_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPage {
    /// Raw image bytes. Transports encode these as base64.
    pub bytes: Vec<u8>,
    /// Image MIME type, typically `image/png`.
    pub mime_type: String,
}

/// Synthetic input event delivered to a window.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer click at page coordinates.
    Click {
        /// Horizontal page coordinate.
        x: f64,
        /// Vertical page coordinate.
        y: f64,
    },
    /// Text typed into the focused element.
    Type {
        /// Text to insert.
        text: String,
    },
}

/// Failures surfaced by an automation host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AutomationError {
    /// The requested window does not exist or has been closed.
    #[error("window {0} not found")]
    WindowNotFound(WindowId),
    /// Navigation was rejected by the host.
    #[error("navigation failed for {url}: {reason}")]
    NavigationFailed {
        /// Target URL.
        url: String,
        /// Host-provided reason.
        reason: String,
    },
    /// Script execution failed inside the page.
    #[error("script execution failed: {0}")]
    ScriptFailed(String),
    /// Any other host failure.
    #[error("{0}")]
    Host(String),
}

// ============================================================================
// SECTION: Host Trait
// ============================================================================

/// Window and page automation collaborator.
#[async_trait]
pub trait AutomationHost: Send + Sync {
    /// Opens a new window navigated to `url` and returns its identifier.
    async fn open_window(&self, url: &str) -> Result<WindowId, AutomationError>;

    /// Lists all live windows in identifier order.
    async fn list_windows(&self) -> Result<Vec<WindowInfo>, AutomationError>;

    /// Closes a window.
    async fn close_window(&self, id: WindowId) -> Result<(), AutomationError>;

    /// Navigates an existing window to `url`.
    async fn load_url(&self, id: WindowId, url: &str) -> Result<(), AutomationError>;

    /// Returns the current page title of a window.
    async fn window_title(&self, id: WindowId) -> Result<String, AutomationError>;

    /// Executes a script in the page and returns its JSON-encoded result.
    async fn execute_script(
        &self,
        id: WindowId,
        code: &str,
    ) -> Result<serde_json::Value, AutomationError>;

    /// Captures the page contents as an image.
    async fn capture_page(&self, id: WindowId) -> Result<CapturedPage, AutomationError>;

    /// Delivers a synthetic input event to a window.
    async fn send_input(&self, id: WindowId, event: InputEvent) -> Result<(), AutomationError>;
}
