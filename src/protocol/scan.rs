//! Minimal forward scan for large capture payloads.
//!
//! Screenshot responses carry base64 image data that can run to
//! megabytes. Parsing such a message into a generic `Value` tree just to
//! pull out one field doubles the allocation cost, so the drain loop for
//! a capture command goes through this module instead: one borrowing
//! pass that classifies the message by its top-level shape and keeps the
//! `result` field as an uninterpreted span of the wire bytes. The base64
//! payload is decoded directly from that span.
//!
//! Events observed while draining are small; those take the ordinary
//! full-parse path.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

use super::message::{Event, RemoteError};

// ============================================================================
// RawScan
// ============================================================================

/// A borrowing view of one incoming message's top-level shape.
///
/// `result` and `error` stay as raw spans of the input; nothing below
/// the top level is materialized.
#[derive(Debug, Deserialize)]
pub struct RawScan<'a> {
    /// Correlation id, present iff the message is a response.
    id: Option<CommandId>,

    /// Result span (success responses).
    #[serde(borrow, default)]
    result: Option<&'a RawValue>,

    /// Error span (failure responses).
    #[serde(borrow, default)]
    error: Option<&'a RawValue>,

    /// Event method, present iff the message is an event.
    #[serde(default)]
    method: Option<Cow<'a, str>>,
}

impl<'a> RawScan<'a> {
    /// Scans a complete wire message without building a value tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the message carries neither an `id`
    /// nor a `method`.
    pub fn classify(bytes: &'a [u8]) -> Result<Self> {
        let scan: Self = serde_json::from_slice(bytes)
            .map_err(|e| Error::protocol(format!("Malformed message in capture drain: {e}")))?;

        if scan.id.is_none() && scan.method.is_none() {
            return Err(Error::protocol(
                "Message has neither response id nor event method",
            ));
        }
        Ok(scan)
    }

    /// Returns `true` if the message is an event.
    #[inline]
    #[must_use]
    pub fn is_event(&self) -> bool {
        self.id.is_none()
    }

    /// Returns the response correlation id, if any.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<CommandId> {
        self.id
    }

    /// Decodes the `data` field of the result span into raw bytes.
    ///
    /// Returns `Ok(None)` when the response carries no `data` field —
    /// a valid empty outcome, e.g. a rejected capture.
    pub fn decode_data(&self) -> Result<Option<Vec<u8>>> {
        let Some(result) = self.result else {
            return Ok(None);
        };

        #[derive(Deserialize)]
        struct DataField<'b> {
            #[serde(borrow, default)]
            data: Option<Cow<'b, str>>,
        }

        let field: DataField<'_> = serde_json::from_str(result.get())
            .map_err(|e| Error::protocol(format!("Malformed capture result: {e}")))?;

        match field.data {
            Some(data) => {
                let bytes = Base64Standard
                    .decode(data.as_bytes())
                    .map_err(|e| Error::decode(format!("Invalid base64 payload: {e}")))?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    /// Parses the error span into the remote error payload, if present.
    fn remote_error(&self) -> Option<RemoteError> {
        let error = self.error?;
        serde_json::from_str(error.get()).ok()
    }
}

// ============================================================================
// ScanOutcome
// ============================================================================

/// Outcome of scanning one drained message against an awaited id.
#[derive(Debug)]
pub enum ScanOutcome {
    /// The message was an event; append to the queue and keep draining.
    Event(Event),
    /// The awaited response arrived carrying a decoded payload.
    Data(Vec<u8>),
    /// The awaited response arrived without a payload field.
    NoData,
}

/// Scans one message drained while awaiting the response to `awaited`.
///
/// Events are parsed in full (they are small) and handed back for the
/// queue. A response id other than `awaited` is a protocol violation:
/// only one command is ever in flight per tab, so a stray id means the
/// channel has desynchronized.
///
/// # Errors
///
/// - [`Error::Protocol`] for malformed shapes or a mismatched id
/// - [`Error::Command`] if the remote answered with an error payload
/// - [`Error::Decode`] if the payload is not valid base64
pub fn scan_message(bytes: &[u8], awaited: CommandId, method: &str) -> Result<ScanOutcome> {
    let scan = RawScan::classify(bytes)?;

    if scan.is_event() {
        let event: Event = serde_json::from_slice(bytes)
            .map_err(|e| Error::protocol(format!("Malformed event in capture drain: {e}")))?;
        return Ok(ScanOutcome::Event(event));
    }

    let Some(id) = scan.id() else {
        return Err(Error::protocol("Response without correlation id"));
    };
    if id != awaited {
        return Err(Error::protocol(format!(
            "Response id {id} while awaiting {awaited}"
        )));
    }

    if let Some(err) = scan.remote_error() {
        return Err(Error::command(method, err.code, err.message));
    }

    match scan.decode_data()? {
        Some(bytes) => Ok(ScanOutcome::Data(bytes)),
        None => Ok(ScanOutcome::NoData),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const METHOD: &str = "Page.captureScreenshot";

    #[test]
    fn test_decodes_payload_from_matching_response() {
        let outcome =
            scan_message(br#"{"id":7,"result":{"data":"aGVsbG8="}}"#, CommandId::new(7), METHOD)
                .expect("scan");

        match outcome {
            ScanOutcome::Data(bytes) => assert_eq!(bytes, b"hello"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_missing_data_is_empty_outcome_not_error() {
        let outcome =
            scan_message(br#"{"id":7,"result":{}}"#, CommandId::new(7), METHOD).expect("scan");
        assert!(matches!(outcome, ScanOutcome::NoData));
    }

    #[test]
    fn test_event_is_parsed_and_handed_back() {
        let outcome = scan_message(
            br#"{"method":"Page.frameNavigated","params":{"frame":{"id":"F1"}}}"#,
            CommandId::new(7),
            METHOD,
        )
        .expect("scan");

        match outcome {
            ScanOutcome::Event(event) => assert_eq!(event.method, "Page.frameNavigated"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_mismatched_id_is_protocol_violation() {
        let err = scan_message(br#"{"id":6,"result":{}}"#, CommandId::new(7), METHOD).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_error_payload_surfaces_as_command_failure() {
        let err = scan_message(
            br#"{"id":7,"error":{"code":-32000,"message":"not attached"}}"#,
            CommandId::new(7),
            METHOD,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Command { code: -32000, .. }));
    }

    #[test]
    fn test_invalid_base64_is_decode_error() {
        let err = scan_message(
            br#"{"id":7,"result":{"data":"!!not-base64!!"}}"#,
            CommandId::new(7),
            METHOD,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_shapeless_message_rejected() {
        let err = scan_message(br#"{"params":{}}"#, CommandId::new(7), METHOD).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_classify_borrows_without_tree() {
        let bytes = br#"{"id":1,"result":{"data":"QUJD"}}"#;
        let scan = RawScan::classify(bytes).expect("classify");
        assert!(!scan.is_event());
        assert_eq!(scan.decode_data().expect("decode"), Some(b"ABC".to_vec()));
    }
}
