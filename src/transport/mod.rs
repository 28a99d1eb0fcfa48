//! WebSocket transport layer.
//!
//! One duplex connection per controlled tab. The transport owns frame
//! reassembly, connection-state tracking and the reconnect path; it
//! knows nothing about correlation ids or command semantics.
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - Dial the tab's debugger endpoint
//! 2. `send` / `receive` - One logical message per call, with a
//!    liveness check (and transparent reconnect) before each operation
//! 3. `close` - Best-effort close frame on teardown
//!
//! A graceful close initiated by the remote is terminal: it generally
//! means the target itself was destroyed, so no reconnect is attempted.

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection, reassembly and liveness.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionState};
