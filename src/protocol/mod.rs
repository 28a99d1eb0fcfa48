//! DevTools wire protocol message types.
//!
//! This module defines the message format spoken over the per-tab
//! WebSocket connection.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Remote | Command request `{id, method, params}` |
//! | `Response` | Remote → Local | `{id, result}` or `{id, error}` |
//! | `Event` | Remote → Local | Notification `{method, params}` |
//!
//! Responses and events are mutually exclusive shapes, discriminated by
//! the presence of `id` versus `method`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `message` | Request/Response/Event types and classification |
//! | `scan` | Zero-tree scan of the screenshot response |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by domain.
pub mod command;

/// Request, response and event message types.
pub mod message;

/// Minimal forward scan for large capture payloads.
pub mod scan;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Clip, Command, EmulationCommand, PageCommand, RuntimeCommand, TargetCommand};
pub use message::{Event, Message, Request, Response};
pub use scan::{RawScan, ScanOutcome};
