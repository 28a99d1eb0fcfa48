//! WebSocket connection, reassembly and liveness.
//!
//! Every `send`/`receive` is preceded by a liveness check: a connection
//! in `Closed` or `Aborted` state transparently re-establishes to the
//! last known endpoint before proceeding, while `RemoteCloseSignaled`
//! fails immediately and permanently.
//!
//! Fragmented wire frames are reassembled below the message-level read,
//! driven by the frame headers' explicit payload lengths. Wire payloads
//! are arbitrary bytes, so no sentinel value could mark the end of a
//! message.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the connection.
///
/// Transitions are driven entirely by network conditions and explicit
/// close calls, never by command-level logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Dial in progress.
    Connecting,
    /// Connected and usable.
    Open,
    /// The peer initiated a graceful close. Terminal: the target behind
    /// this connection is gone, reconnecting would be meaningless.
    RemoteCloseSignaled,
    /// Stream ended or was closed locally. Eligible for reconnection.
    Closed,
    /// Transport-level failure. Eligible for reconnection.
    Aborted,
}

// ============================================================================
// Connection
// ============================================================================

/// One duplex message channel to a tab's debugger endpoint.
///
/// Not internally synchronized: callers serialize access through the
/// tab's command lock.
pub struct Connection {
    /// Last known endpoint, used by the reconnect path.
    endpoint: Url,
    /// Underlying stream; `None` while not connected.
    ws: Option<WsStream>,
    /// Current lifecycle state.
    state: ConnectionState,
}

impl Connection {
    /// Dials the given `ws://` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the endpoint is not a valid
    /// WebSocket URL or the dial fails.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::connection(format!("Invalid endpoint {endpoint}: {e}")))?;
        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(Error::connection(format!(
                "Endpoint {endpoint} is not a WebSocket URL"
            )));
        }

        let mut connection = Self {
            endpoint,
            ws: None,
            state: ConnectionState::Closed,
        };
        connection.reconnect().await?;
        Ok(connection)
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the endpoint this connection dials.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Marks the connection aborted, forcing a reconnect on next use.
    ///
    /// Used when a command cycle is abandoned mid-drain (timeout): the
    /// stale response left on the wire must not reach a later command.
    pub fn abort(&mut self) {
        if self.state == ConnectionState::Open {
            debug!(endpoint = %self.endpoint, "Connection marked aborted");
            self.state = ConnectionState::Aborted;
            self.ws = None;
        }
    }

    /// Transmits one complete logical message.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the remote already signaled close
    /// - [`Error::WebSocket`] on transport failure (state becomes
    ///   `Aborted`)
    pub async fn send(&mut self, text: String) -> Result<()> {
        self.ensure_open().await?;

        let ws = self.ws.as_mut().ok_or(Error::ConnectionClosed)?;
        match ws.send(Message::text(text)).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = ConnectionState::Aborted;
                self.ws = None;
                Err(Error::WebSocket(e))
            }
        }
    }

    /// Blocks until one complete logical message has arrived, returning
    /// its raw bytes.
    ///
    /// Ping/pong frames are absorbed here; fragmented messages arrive
    /// already reassembled from their final frame.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] on a graceful remote close
    /// - [`Error::Connection`] / [`Error::WebSocket`] on transport
    ///   failure (state becomes `Closed` / `Aborted`)
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        self.ensure_open().await?;

        loop {
            let frame = {
                let ws = self.ws.as_mut().ok_or(Error::ConnectionClosed)?;
                ws.next().await
            };

            match frame {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "Received text message");
                    return Ok(text.as_bytes().to_vec());
                }
                Some(Ok(Message::Binary(bytes))) => {
                    trace!(len = bytes.len(), "Received binary message");
                    return Ok(bytes.to_vec());
                }
                // Raw frames never surface on a message-level read.
                Some(Ok(Message::Frame(_) | Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    debug!(endpoint = %self.endpoint, "Remote signaled close");
                    self.state = ConnectionState::RemoteCloseSignaled;
                    self.ws = None;
                    return Err(Error::ConnectionClosed);
                }
                Some(Err(e)) => {
                    warn!(endpoint = %self.endpoint, error = %e, "Transport failure");
                    self.state = ConnectionState::Aborted;
                    self.ws = None;
                    return Err(Error::WebSocket(e));
                }
                None => {
                    debug!(endpoint = %self.endpoint, "Stream ended");
                    self.state = ConnectionState::Closed;
                    self.ws = None;
                    return Err(Error::connection("Stream ended"));
                }
            }
        }
    }

    /// Closes the connection with a best-effort close frame.
    ///
    /// Correctness never depends on this being called; teardown paths
    /// invoke it explicitly and ignore its outcome.
    pub async fn close(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            let _ = ws.close(None).await;
        }
        if self.state != ConnectionState::RemoteCloseSignaled {
            self.state = ConnectionState::Closed;
        }
    }

    /// Liveness check preceding every send/receive.
    async fn ensure_open(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Open | ConnectionState::Connecting => Ok(()),
            ConnectionState::RemoteCloseSignaled => Err(Error::ConnectionClosed),
            ConnectionState::Closed | ConnectionState::Aborted => self.reconnect().await,
        }
    }

    /// Re-establishes the stream to the last known endpoint.
    async fn reconnect(&mut self) -> Result<()> {
        self.state = ConnectionState::Connecting;
        debug!(endpoint = %self.endpoint, "Connecting");

        match connect_async(self.endpoint.as_str()).await {
            Ok((ws, _)) => {
                self.ws = Some(ws);
                self.state = ConnectionState::Open;
                debug!(endpoint = %self.endpoint, "Connected");
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Aborted;
                Err(Error::connection(format!(
                    "Connect to {} failed: {e}",
                    self.endpoint
                )))
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint.as_str())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn bind() -> (TcpListener, String) {
        crate::tab::testkit::init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        (listener, format!("ws://{addr}"))
    }

    #[tokio::test]
    async fn test_send_receive_roundtrip() {
        let (listener, endpoint) = bind().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            let msg = ws.next().await.expect("message").expect("ok");
            assert_eq!(msg.into_text().expect("text"), "{\"id\":1}");
            ws.send(Message::text("{\"id\":1,\"result\":{}}"))
                .await
                .expect("reply");
        });

        let mut conn = Connection::connect(&endpoint).await.expect("connect");
        assert_eq!(conn.state(), ConnectionState::Open);

        conn.send("{\"id\":1}".to_string()).await.expect("send");
        let reply = conn.receive().await.expect("receive");
        assert_eq!(reply, b"{\"id\":1,\"result\":{}}");
    }

    #[tokio::test]
    async fn test_abrupt_close_reconnects_on_next_operation() {
        let (listener, endpoint) = bind().await;

        tokio::spawn(async move {
            // First connection dropped without a close handshake.
            let (stream, _) = listener.accept().await.expect("accept");
            let ws = accept_async(stream).await.expect("handshake");
            drop(ws);

            // Second connection serves one echo.
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            let msg = ws.next().await.expect("message").expect("ok");
            ws.send(msg).await.expect("echo");
        });

        let mut conn = Connection::connect(&endpoint).await.expect("connect");

        let err = conn.receive().await.unwrap_err();
        assert!(!err.is_terminal());
        assert!(matches!(
            conn.state(),
            ConnectionState::Aborted | ConnectionState::Closed
        ));

        // Next operation re-establishes transparently and succeeds.
        conn.send("{\"id\":2}".to_string()).await.expect("send after reconnect");
        let echoed = conn.receive().await.expect("receive after reconnect");
        assert_eq!(echoed, b"{\"id\":2}");
        assert_eq!(conn.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_fragmented_message_arrives_reassembled() {
        use tokio_tungstenite::tungstenite::protocol::frame::Frame;
        use tokio_tungstenite::tungstenite::protocol::frame::coding::{Data, OpCode};

        let (listener, endpoint) = bind().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            // One logical message split across three wire frames.
            ws.send(Message::Frame(Frame::message(
                "{\"id\":5,",
                OpCode::Data(Data::Text),
                false,
            )))
            .await
            .expect("first fragment");
            ws.send(Message::Frame(Frame::message(
                "\"result\"",
                OpCode::Data(Data::Continue),
                false,
            )))
            .await
            .expect("middle fragment");
            ws.send(Message::Frame(Frame::message(
                ":{}}",
                OpCode::Data(Data::Continue),
                true,
            )))
            .await
            .expect("final fragment");
        });

        let mut conn = Connection::connect(&endpoint).await.expect("connect");
        let message = conn.receive().await.expect("receive");
        assert_eq!(message, b"{\"id\":5,\"result\":{}}");
    }

    #[tokio::test]
    async fn test_graceful_remote_close_is_terminal() {
        let (listener, endpoint) = bind().await;
        let accepts = Arc::new(AtomicUsize::new(0));
        let accepts_srv = Arc::clone(&accepts);

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.expect("accept");
                accepts_srv.fetch_add(1, Ordering::SeqCst);
                let mut ws = accept_async(stream).await.expect("handshake");
                ws.close(None).await.expect("close");
            }
        });

        let mut conn = Connection::connect(&endpoint).await.expect("connect");

        let err = conn.receive().await.unwrap_err();
        assert!(err.is_terminal());
        assert_eq!(conn.state(), ConnectionState::RemoteCloseSignaled);

        // Subsequent operations fail immediately without a new dial.
        let err = conn.send("{\"id\":3}".to_string()).await.unwrap_err();
        assert!(err.is_terminal());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(accepts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejects_non_websocket_endpoint() {
        let err = Connection::connect("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[tokio::test]
    async fn test_abort_forces_reconnect() {
        let (listener, endpoint) = bind().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let _first = accept_async(stream).await.expect("handshake");

            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            let msg = ws.next().await.expect("message").expect("ok");
            ws.send(msg).await.expect("echo");
        });

        let mut conn = Connection::connect(&endpoint).await.expect("connect");
        conn.abort();
        assert_eq!(conn.state(), ConnectionState::Aborted);

        conn.send("{\"id\":4}".to_string()).await.expect("send");
        assert_eq!(conn.receive().await.expect("receive"), b"{\"id\":4}");
    }
}
