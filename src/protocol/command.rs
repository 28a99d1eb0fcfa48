//! Command definitions organized by domain.
//!
//! Commands follow the DevTools `Domain.methodName` format.
//!
//! # Command Domains
//!
//! | Domain | Commands |
//! |--------|----------|
//! | `Page` | Navigation, content injection, screenshots |
//! | `Emulation` | Viewport metrics |
//! | `Runtime` | JavaScript evaluation |
//! | `Target` | Tab teardown |
//!
//! This is deliberately the exact command set the capture core needs —
//! not a general automation surface.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::{FrameId, TargetId};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
///
/// This enum wraps domain-specific command enums for unified serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Page domain commands.
    Page(PageCommand),
    /// Emulation domain commands.
    Emulation(EmulationCommand),
    /// Runtime domain commands.
    Runtime(RuntimeCommand),
    /// Target domain commands.
    Target(TargetCommand),
}

impl Command {
    /// Returns the wire method name of this command.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Page(cmd) => cmd.method(),
            Self::Emulation(cmd) => cmd.method(),
            Self::Runtime(cmd) => cmd.method(),
            Self::Target(cmd) => cmd.method(),
        }
    }
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page domain commands for navigation, injection and capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Enable page lifecycle events.
    #[serde(rename = "Page.enable")]
    Enable,

    /// Disable page lifecycle events.
    #[serde(rename = "Page.disable")]
    Disable,

    /// Navigate to URL.
    #[serde(rename = "Page.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
    },

    /// Replace the document content of a frame.
    #[serde(rename = "Page.setDocumentContent")]
    SetDocumentContent {
        /// Frame to set content on.
        #[serde(rename = "frameId")]
        frame_id: FrameId,
        /// HTML content.
        html: String,
    },

    /// Capture a screenshot of the visible viewport.
    #[serde(rename = "Page.captureScreenshot")]
    CaptureScreenshot {
        /// Image format ("png" or "jpeg").
        format: String,
        /// JPEG quality (0-100), absent for PNG.
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<u8>,
        /// Region to capture, absent for the full viewport.
        #[serde(skip_serializing_if = "Option::is_none")]
        clip: Option<Clip>,
    },

    /// Bring the tab to the foreground.
    #[serde(rename = "Page.bringToFront")]
    BringToFront,
}

impl PageCommand {
    /// Returns the wire method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Enable => "Page.enable",
            Self::Disable => "Page.disable",
            Self::Navigate { .. } => "Page.navigate",
            Self::SetDocumentContent { .. } => "Page.setDocumentContent",
            Self::CaptureScreenshot { .. } => "Page.captureScreenshot",
            Self::BringToFront => "Page.bringToFront",
        }
    }
}

// ============================================================================
// Emulation Commands
// ============================================================================

/// Emulation domain commands for viewport control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum EmulationCommand {
    /// Override device metrics (viewport size and scale).
    #[serde(rename = "Emulation.setDeviceMetricsOverride")]
    SetDeviceMetricsOverride {
        /// Viewport width in CSS pixels.
        width: u32,
        /// Viewport height in CSS pixels.
        height: u32,
        /// Device scale factor.
        #[serde(rename = "deviceScaleFactor")]
        device_scale_factor: f64,
        /// Whether to emulate a mobile viewport.
        mobile: bool,
    },
}

impl EmulationCommand {
    /// Returns the wire method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::SetDeviceMetricsOverride { .. } => "Emulation.setDeviceMetricsOverride",
        }
    }
}

// ============================================================================
// Runtime Commands
// ============================================================================

/// Runtime domain commands for script execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RuntimeCommand {
    /// Evaluate a JavaScript expression in the page.
    #[serde(rename = "Runtime.evaluate")]
    Evaluate {
        /// Expression to evaluate.
        expression: String,
        /// Return the result by value rather than as a remote reference.
        #[serde(rename = "returnByValue")]
        return_by_value: bool,
        /// Resolve promises before returning.
        #[serde(rename = "awaitPromise")]
        await_promise: bool,
    },
}

impl RuntimeCommand {
    /// Returns the wire method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Evaluate { .. } => "Runtime.evaluate",
        }
    }
}

// ============================================================================
// Target Commands
// ============================================================================

/// Target domain commands for tab lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum TargetCommand {
    /// Close a target (tab).
    #[serde(rename = "Target.closeTarget")]
    CloseTarget {
        /// Target to close.
        #[serde(rename = "targetId")]
        target_id: TargetId,
    },
}

impl TargetCommand {
    /// Returns the wire method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::CloseTarget { .. } => "Target.closeTarget",
        }
    }
}

// ============================================================================
// Clip
// ============================================================================

/// Region of the page to capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// X offset in CSS pixels.
    pub x: f64,
    /// Y offset in CSS pixels.
    pub y: f64,
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
    /// Page scale factor.
    pub scale: f64,
}

// ============================================================================
// Tests
// ============================================================================
