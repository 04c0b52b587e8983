// crates/shellbridge-tools/src/simulated.rs
// ============================================================================
// Module: Simulated Host
// Description: Deterministic in-memory automation host.
// Purpose: Back the tool catalog in development, demos, and tests.
// Dependencies: async-trait, serde_json, tokio
// ============================================================================

//! ## Overview
//! [`SimulatedHost`] implements [`AutomationHost`] without any browser. It
//! tracks windows in a map, derives page titles from URLs, evaluates a tiny
//! script surface, and returns a fixed one-pixel PNG for captures. The same
//! inputs always produce the same outputs, which keeps transport tests
//! deterministic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Mutex;

use crate::host::AutomationError;
use crate::host::AutomationHost;
use crate::host::CapturedPage;
use crate::host::InputEvent;
use crate::host::WindowId;
use crate::host::WindowInfo;

// ============================================================================
// SECTION: Simulated Host
// ============================================================================

/// Smallest valid PNG: one transparent pixel.
const ONE_PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// One simulated window.
#[derive(Debug, Clone)]
struct SimWindow {
    /// Current URL.
    url: String,
    /// Derived title.
    title: String,
    /// Input events received, oldest first.
    inputs: Vec<InputEvent>,
}

/// Mutable host state behind one lock.
#[derive(Debug, Default)]
struct SimState {
    /// Live windows by identifier.
    windows: BTreeMap<WindowId, SimWindow>,
    /// Next identifier to assign. Identifiers are never reused.
    next_id: u64,
}

/// In-memory [`AutomationHost`] with deterministic behavior.
#[derive(Default)]
pub struct SimulatedHost {
    /// All mutable state.
    state: Mutex<SimState>,
}

impl SimulatedHost {
    /// Creates an empty host with no windows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the input events a window has received, for test assertions.
    pub async fn inputs_for(&self, id: WindowId) -> Option<Vec<InputEvent>> {
        let state = self.state.lock().await;
        state.windows.get(&id).map(|w| w.inputs.clone())
    }
}

/// Derives a stable page title from a URL, as the simulation's "renderer".
fn title_for(url: &str) -> String {
    let trimmed = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = trimmed.split('/').next().unwrap_or(trimmed);
    if host.is_empty() {
        "about:blank".to_string()
    } else {
        format!("{host} (simulated)")
    }
}

#[async_trait]
impl AutomationHost for SimulatedHost {
    async fn open_window(&self, url: &str) -> Result<WindowId, AutomationError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = WindowId(state.next_id);
        state.windows.insert(
            id,
            SimWindow {
                url: url.to_string(),
                title: title_for(url),
                inputs: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn list_windows(&self) -> Result<Vec<WindowInfo>, AutomationError> {
        let state = self.state.lock().await;
        Ok(state
            .windows
            .iter()
            .map(|(id, w)| WindowInfo {
                id: *id,
                url: w.url.clone(),
                title: w.title.clone(),
            })
            .collect())
    }

    async fn close_window(&self, id: WindowId) -> Result<(), AutomationError> {
        let mut state = self.state.lock().await;
        state
            .windows
            .remove(&id)
            .map(|_| ())
            .ok_or(AutomationError::WindowNotFound(id))
    }

    async fn load_url(&self, id: WindowId, url: &str) -> Result<(), AutomationError> {
        let mut state = self.state.lock().await;
        let window = state
            .windows
            .get_mut(&id)
            .ok_or(AutomationError::WindowNotFound(id))?;
        window.url = url.to_string();
        window.title = title_for(url);
        Ok(())
    }

    async fn window_title(&self, id: WindowId) -> Result<String, AutomationError> {
        let state = self.state.lock().await;
        state
            .windows
            .get(&id)
            .map(|w| w.title.clone())
            .ok_or(AutomationError::WindowNotFound(id))
    }

    async fn execute_script(
        &self,
        id: WindowId,
        code: &str,
    ) -> Result<Value, AutomationError> {
        let state = self.state.lock().await;
        let window = state
            .windows
            .get(&id)
            .ok_or(AutomationError::WindowNotFound(id))?;
        // Recognize the handful of expressions the sample tools rely on and
        // echo everything else back, so results stay deterministic.
        let result = match code.trim() {
            "document.title" => json!(window.title),
            "window.location.href" => json!(window.url),
            "1 + 1" => json!(2),
            other => json!({ "evaluated": other }),
        };
        Ok(result)
    }

    async fn capture_page(&self, id: WindowId) -> Result<CapturedPage, AutomationError> {
        let state = self.state.lock().await;
        if !state.windows.contains_key(&id) {
            return Err(AutomationError::WindowNotFound(id));
        }
        Ok(CapturedPage {
            bytes: ONE_PIXEL_PNG.to_vec(),
            mime_type: "image/png".to_string(),
        })
    }

    async fn send_input(&self, id: WindowId, event: InputEvent) -> Result<(), AutomationError> {
        let mut state = self.state.lock().await;
        let window = state
            .windows
            .get_mut(&id)
            .ok_or(AutomationError::WindowNotFound(id))?;
        window.inputs.push(event);
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
