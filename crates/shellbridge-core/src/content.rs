// crates/shellbridge-core/src/content.rs
// ============================================================================
// Module: Result Envelopes
// Description: Content-block envelopes returned by every tool invocation.
// Purpose: Give both transports one uniform success/failure response shape.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every tool call resolves to a [`ResultEnvelope`]: an ordered sequence of
//! [`ContentBlock`] values plus an `isError` flag. Handlers build envelopes
//! directly; the dispatcher substitutes a single-element error envelope when a
//! call fails before or inside the handler. Responses are never partially
//! successful.
//!
//! ## Invariants
//! - `is_error = true` implies at least one text block with a human-readable
//!   message.

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Content Blocks
// ============================================================================

/// Tagged unit of tool output.
///
/// # Invariants
/// - `Image.data` is base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Textual output.
    Text {
        /// UTF-8 text payload.
        text: String,
    },
    /// Embedded image output.
    Image {
        /// Base64-encoded image bytes.
        data: String,
        /// Image MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl ContentBlock {
    /// Builds a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
        }
    }

    /// Builds an image block from base64 data and a MIME type.
    #[must_use]
    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Image {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}

// ============================================================================
// SECTION: Result Envelopes
// ============================================================================

/// Uniform response envelope for tool invocations.
///
/// # Invariants
/// - Error envelopes always carry a text block describing the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Ordered output blocks.
    pub content: Vec<ContentBlock>,
    /// True when the invocation failed at the tool level.
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ResultEnvelope {
    /// Builds a success envelope from content blocks.
    #[must_use]
    pub const fn success(content: Vec<ContentBlock>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Builds a success envelope with a single text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(vec![ContentBlock::text(text)])
    }

    /// Builds an error envelope with a single human-readable text block.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: true,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
