//! Tab sessions: command dispatch, navigation and capture.
//!
//! One [`Tab`] per controlled browser tab, bound to one duplex
//! connection. All protocol traffic for a tab flows through its
//! command lock: a single `tokio` mutex guarding the connection, the
//! correlation-id counter and the event history together, so the
//! one-command-in-flight invariant is structural rather than
//! conventional.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Tab handle and command dispatch |
//! | `events` | Arrival-ordered event history |
//! | `navigation` | Navigate / inject-HTML sequences |
//! | `screenshot` | Capture under the global capture gate |
//! | `script` | Evaluation and viewport control |

// ============================================================================
// Submodules
// ============================================================================

/// Tab handle and command dispatch.
pub mod core;

/// Arrival-ordered event history.
pub mod events;

/// Navigation sequences.
pub mod navigation;

/// Screenshot capture.
pub mod screenshot;

/// Script evaluation and viewport control.
pub mod script;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Tab;
pub use events::EventQueue;
pub use screenshot::{ImageFormat, ScreenshotBuilder};

// ============================================================================
// Test Support
// ============================================================================
