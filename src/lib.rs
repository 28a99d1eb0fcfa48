//! Headless-browser screenshot capture over the DevTools wire protocol.
//!
//! This crate is the session/transport core for driving a
//! Chromium-family browser: it speaks the JSON debugging protocol over
//! one WebSocket per controlled tab, correlating command responses with
//! spontaneous events on the shared connection, surviving connection
//! loss, and extracting multi-megabyte screenshot payloads without
//! building a JSON tree around them.
//!
//! # Architecture
//!
//! - Each [`Tab`] owns: one duplex connection + correlation-id counter
//!   + event history, all guarded by a single per-tab command lock
//! - Exactly one command is in flight per tab at any instant
//! - Screenshot capture additionally serializes through a
//!   browser-wide capture gate (one rendering surface per instance)
//! - Browser process supervision and target creation are external
//!   collaborators; they hand a [`TargetDescriptor`] to
//!   [`Browser::attach`]
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_capture::{Browser, Result, TargetDescriptor};
//!
//! # async fn example(descriptor: TargetDescriptor) -> Result<()> {
//! let browser = Browser::new();
//! let tab = browser.attach(descriptor).await?;
//!
//! tab.set_viewport(1280, 720, 1.0, false).await?;
//! tab.goto("https://example.com").await?;
//! let image = tab.capture_screenshot().await?;
//!
//! if let Some(png) = image {
//!     std::fs::write("page.png", png)?;
//! }
//! tab.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Browser-instance scope and tab attachment |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types and the capture scan |
//! | [`tab`] | Tab sessions: dispatch, navigation, capture |
//! | [`transport`] | WebSocket connection layer |

// ============================================================================
// Modules
// ============================================================================

/// Browser-instance scope and tab attachment.
pub mod browser;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers for protocol entities.
pub mod identifiers;

/// Wire protocol message types.
pub mod protocol;

/// Tab sessions: command dispatch, navigation and capture.
pub mod tab;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{Browser, TargetDescriptor};

// Tab types
pub use tab::{EventQueue, ImageFormat, ScreenshotBuilder, Tab};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CommandId, FrameId, TargetId};

// Protocol types
pub use protocol::{Clip, Command};

// Transport types
pub use transport::{Connection, ConnectionState};
