//! Request, response and event message types.
//!
//! These are the full-parse message shapes used everywhere except the
//! screenshot drain, which goes through [`super::scan`] instead.
//!
//! # Format
//!
//! Request:
//! ```json
//! { "id": 3, "method": "Page.navigate", "params": { "url": "..." } }
//! ```
//!
//! Response (exactly one of `result` / `error`):
//! ```json
//! { "id": 3, "result": { ... } }
//! { "id": 3, "error": { "code": -32000, "message": "..." } }
//! ```
//!
//! Event:
//! ```json
//! { "method": "Page.loadEventFired", "params": { ... } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command request from local end to remote end.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Correlation id, unique per tab and strictly increasing.
    pub id: CommandId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, command: Command) -> Self {
        Self { id, command }
    }

    /// Serializes the request to its wire form.
    pub fn to_wire(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Json)
    }
}

// ============================================================================
// Message
// ============================================================================

/// A parsed incoming message: either a command response or an event.
///
/// The two shapes are mutually exclusive; a message carries `id` or
/// `method`, never both as its discriminator.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Response correlated to an earlier request.
    Response(Response),
    /// Spontaneous notification, not tied to any command.
    Event(Event),
}

impl Message {
    /// Parses a complete wire message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the bytes match neither shape.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            Error::protocol(format!(
                "Malformed message ({e}): {}",
                String::from_utf8_lossy(&bytes[..bytes.len().min(256)])
            ))
        })
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from remote end to local end.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: CommandId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error payload (if failure).
    #[serde(default)]
    pub error: Option<RemoteError>,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, surfacing a remote error payload as a
    /// command failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] carrying the remote error detail.
    pub fn into_result(self, method: &str) -> Result<Value> {
        match self.error {
            Some(err) => Err(Error::command(method, err.code, err.message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// RemoteError
// ============================================================================

/// Error payload carried by a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    /// Remote error code.
    #[serde(default)]
    pub code: i64,

    /// Remote error message.
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Event
// ============================================================================

/// An unsolicited protocol notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Returns the domain name from the method.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
