//! Error types for the capture core.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::WebSocket`] |
//! | Protocol | [`Error::Protocol`] |
//! | Command | [`Error::Command`], [`Error::Navigation`], [`Error::Script`] |
//! | Execution | [`Error::Timeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Decode`] |
//!
//! Transport failures other than a graceful remote close are retried by
//! the connection's reconnect path; everything else surfaces to the
//! caller unchanged.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CommandId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Connection could not be established or was lost mid-operation.
    ///
    /// The connection state is left `Aborted`; the next operation on the
    /// tab will attempt a transparent reconnect.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The remote signaled a graceful close.
    ///
    /// Terminal for the tab: a graceful close generally means the target
    /// itself was destroyed, so no reconnect is attempted.
    #[error("Connection closed by remote")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation: malformed message shape, or a response id that
    /// does not match the single in-flight command.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Command Errors
    // ========================================================================
    /// The remote answered a command with an `error` payload.
    #[error("Command {method} failed: {message} (code {code})")]
    Command {
        /// Method of the failed command.
        method: String,
        /// Remote error code.
        code: i64,
        /// Remote error message.
        message: String,
    },

    /// Navigation was rejected by the browser (`errorText` in the
    /// navigate response).
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed to load.
        url: String,
        /// Browser-reported error text.
        message: String,
    },

    /// Script evaluation threw in the page.
    #[error("Script error: {message}")]
    Script {
        /// Exception description from the page.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation exceeded its timeout.
    ///
    /// The connection is marked `Aborted` so the next operation
    /// reconnects instead of meeting the stale response.
    #[error("Command {command_id} timed out after {timeout_ms}ms")]
    Timeout {
        /// The command that timed out.
        command_id: CommandId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Base64 payload decode failure.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a command error from a remote error payload.
    #[inline]
    pub fn command(method: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Command {
            method: method.into(),
            code,
            message: message.into(),
        }
    }

    /// Creates a navigation error.
    #[inline]
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(command_id: CommandId, timeout_ms: u64) -> Self {
        Self::Timeout {
            command_id,
            timeout_ms,
        }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is terminal for the tab.
    ///
    /// Terminal errors must not trigger reconnection.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
