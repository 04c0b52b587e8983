// crates/shellbridge-tools/src/lib.rs
// ============================================================================
// Module: shellbridge-tools
// Description: Automation host trait, simulated host, and built-in catalog.
// Purpose: Bind the dispatch core to a window automation layer.
// Dependencies: shellbridge-core, async-trait, base64, serde_json, tokio
// ============================================================================

//! ## Overview
//! `shellbridge-tools` sits between the transport-independent engine in
//! `shellbridge-core` and whatever actually drives windows. It defines the
//! [`AutomationHost`] collaborator trait, ships a deterministic in-memory
//! implementation for development and tests, and registers the built-in
//! window, page, and system tools against any host.
//!
//! ## Invariants
//! - Tool handlers reach the automation layer only through
//!   [`AutomationHost`]; no handler holds a concrete host type.

pub mod catalog;
pub mod host;
pub mod simulated;

pub use catalog::register_catalog;
pub use host::AutomationError;
pub use host::AutomationHost;
pub use host::CapturedPage;
pub use host::InputEvent;
pub use host::WindowId;
pub use host::WindowInfo;
pub use simulated::SimulatedHost;
