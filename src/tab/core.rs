//! Tab handle and command dispatch.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, TargetId};
use crate::protocol::{Command, Message, Request, Response, TargetCommand};
use crate::transport::Connection;

use super::events::EventQueue;

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for one command/response cycle.
pub(crate) const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Channel
// ============================================================================

/// Everything a command cycle touches, bundled under one lock.
///
/// The connection, the correlation-id counter and the event history are
/// exclusively owned here and mutable only through a guard on the tab's
/// command mutex, which makes the shared-resource policy structural:
/// nothing outside a locked cycle can allocate an id or append an event.
pub(crate) struct Channel {
    /// The tab's duplex connection.
    pub(crate) connection: Connection,
    /// Last allocated correlation id. Strictly increasing, never reused.
    last_id: CommandId,
    /// Events observed since the last reset.
    pub(crate) events: EventQueue,
}

impl Channel {
    pub(crate) fn new(connection: Connection) -> Self {
        Self {
            connection,
            last_id: CommandId::new(0),
            events: EventQueue::new(),
        }
    }

    /// Allocates the next correlation id.
    fn next_id(&mut self) -> CommandId {
        self.last_id = self.last_id.next();
        self.last_id
    }

    /// Serializes and transmits a command, returning its correlation id.
    pub(crate) async fn send_command(&mut self, command: &Command) -> Result<CommandId> {
        let id = self.next_id();
        let request = Request::new(id, command.clone());
        self.connection.send(request.to_wire()?).await?;
        trace!(%id, method = command.method(), "Command sent");
        Ok(id)
    }

    /// Drains the connection until the response correlated to `id`.
    ///
    /// Events arriving in between are appended to the history in wire
    /// order. A response with any other id fails the operation: only
    /// one command is ever in flight on this channel, so a stray id
    /// means the channel has desynchronized.
    pub(crate) async fn await_response(&mut self, id: CommandId) -> Result<Response> {
        loop {
            let bytes = self.connection.receive().await?;
            match Message::parse(&bytes)? {
                Message::Event(event) => {
                    trace!(method = %event.method, "Event queued");
                    self.events.push(event);
                }
                Message::Response(response) => {
                    if response.id != id {
                        return Err(Error::protocol(format!(
                            "Response id {} while awaiting {id}",
                            response.id
                        )));
                    }
                    return Ok(response);
                }
            }
        }
    }

    /// Receives exactly one message, which must be an event.
    ///
    /// Used by waits that grow the event history while no command is in
    /// flight; a response arriving here is a protocol violation.
    pub(crate) async fn receive_event(&mut self) -> Result<()> {
        let bytes = self.connection.receive().await?;
        match Message::parse(&bytes)? {
            Message::Event(event) => {
                trace!(method = %event.method, "Event queued");
                self.events.push(event);
                Ok(())
            }
            Message::Response(response) => Err(Error::protocol(format!(
                "Response id {} while no command is awaited",
                response.id
            ))),
        }
    }
}

// ============================================================================
// Tab
// ============================================================================

/// Internal shared state for a tab session.
pub(crate) struct TabInner {
    /// Browser-assigned target id.
    pub(crate) target_id: TargetId,
    /// Current url, updated on successful navigation.
    pub(crate) current_url: parking_lot::Mutex<String>,
    /// The command lock and everything it guards.
    pub(crate) channel: AsyncMutex<Channel>,
    /// Capture gate shared by all tabs of the owning browser instance.
    pub(crate) capture_gate: Arc<AsyncMutex<()>>,
    /// Timeout applied to each command cycle.
    pub(crate) command_timeout: Duration,
}

/// A handle to one controlled browser tab.
///
/// Cloning is cheap; all clones share the same session and serialize
/// through the same command lock.
#[derive(Clone)]
pub struct Tab {
    pub(crate) inner: Arc<TabInner>,
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab")
            .field("target_id", &self.inner.target_id)
            .field("url", &*self.inner.current_url.lock())
            .finish_non_exhaustive()
    }
}

impl Tab {
    pub(crate) fn new(
        target_id: TargetId,
        url: String,
        connection: Connection,
        capture_gate: Arc<AsyncMutex<()>>,
    ) -> Self {
        Self {
            inner: Arc::new(TabInner {
                target_id,
                current_url: parking_lot::Mutex::new(url),
                channel: AsyncMutex::new(Channel::new(connection)),
                capture_gate,
                command_timeout: DEFAULT_COMMAND_TIMEOUT,
            }),
        }
    }
}

// ============================================================================
// Tab - Accessors
// ============================================================================

impl Tab {
    /// Returns the browser-assigned target id.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> &TargetId {
        &self.inner.target_id
    }

    /// Returns the tab's current url.
    #[must_use]
    pub fn url(&self) -> String {
        self.inner.current_url.lock().clone()
    }
}

// ============================================================================
// Tab - Internal
// ============================================================================

impl Tab {
    /// Runs one command cycle under the command lock.
    ///
    /// On timeout the connection is marked aborted: the response is
    /// still somewhere on the wire, and letting it reach a later
    /// command would desynchronize the channel.
    pub(crate) async fn call(&self, command: Command) -> Result<Value> {
        let mut channel = self.inner.channel.lock().await;
        self.call_locked(&mut channel, command).await
    }

    /// Runs one command cycle on an already-locked channel.
    pub(crate) async fn call_locked(
        &self,
        channel: &mut Channel,
        command: Command,
    ) -> Result<Value> {
        let method = command.method();
        let id = channel.send_command(&command).await?;
        match timeout(self.inner.command_timeout, channel.await_response(id)).await {
            Ok(response) => response?.into_result(method),
            Err(_) => {
                channel.connection.abort();
                Err(Error::timeout(
                    id,
                    self.inner.command_timeout.as_millis() as u64,
                ))
            }
        }
    }
}

// ============================================================================
// Tab - Teardown
// ============================================================================

impl Tab {
    /// Tears the session down deterministically.
    ///
    /// Notifies the remote with a best-effort close-target command,
    /// then closes the connection. The command lock's resources are
    /// released when the guard drops, on this path as on any other;
    /// nothing here relies on `Drop` for correctness.
    pub async fn close(&self) {
        debug!(target_id = %self.inner.target_id, "Closing tab");
        let mut channel = self.inner.channel.lock().await;

        let notify = Command::Target(TargetCommand::CloseTarget {
            target_id: self.inner.target_id.clone(),
        });
        if let Ok(id) = channel.send_command(&notify).await {
            let _ = timeout(self.inner.command_timeout, channel.await_response(id)).await;
        }

        channel.connection.close().await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::protocol::PageCommand;
    use crate::tab::testkit::{empty_success, mock_endpoint, shared, tab_for};

    fn enable() -> Command {
        Command::Page(PageCommand::Enable)
    }

    #[tokio::test]
    async fn test_correlation_ids_strictly_increase() {
        let seen = shared(Vec::<u64>::new());
        let seen_srv = seen.clone();

        let endpoint = mock_endpoint(move |request| {
            let id = request["id"].as_u64().expect("id");
            seen_srv.lock().expect("lock").push(id);
            vec![format!("{{\"id\":{id},\"result\":{{}}}}")]
        })
        .await;
        let tab = tab_for(&endpoint).await;

        for _ in 0..5 {
            tab.call(enable()).await.expect("call");
        }

        let ids = seen.lock().expect("lock").clone();
        assert_eq!(ids.len(), 5);
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids not increasing: {ids:?}");
    }

    #[tokio::test]
    async fn test_interleaved_events_preserved_in_order() {
        let endpoint = mock_endpoint(|request| {
            let id = request["id"].as_u64().expect("id");
            vec![
                "{\"method\":\"Page.frameStartedLoading\",\"params\":{\"frameId\":\"F1\"}}"
                    .to_string(),
                "{\"method\":\"Page.domContentEventFired\",\"params\":{\"timestamp\":1}}"
                    .to_string(),
                format!("{{\"id\":{id},\"result\":{{}}}}"),
            ]
        })
        .await;
        let tab = tab_for(&endpoint).await;

        tab.call(enable()).await.expect("call");

        let channel = tab.inner.channel.lock().await;
        let methods: Vec<&str> = channel
            .events
            .as_slice()
            .iter()
            .map(|e| e.method.as_str())
            .collect();
        assert_eq!(
            methods,
            ["Page.frameStartedLoading", "Page.domContentEventFired"]
        );
    }

    #[tokio::test]
    async fn test_mismatched_response_id_is_fatal() {
        let endpoint = mock_endpoint(|request| {
            let id = request["id"].as_u64().expect("id");
            vec![format!("{{\"id\":{},\"result\":{{}}}}", id + 100)]
        })
        .await;
        let tab = tab_for(&endpoint).await;

        let err = tab.call(enable()).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_remote_error_payload_surfaces_as_command_failure() {
        let endpoint = mock_endpoint(|request| {
            let id = request["id"].as_u64().expect("id");
            vec![format!(
                "{{\"id\":{id},\"error\":{{\"code\":-32601,\"message\":\"method not found\"}}}}"
            )]
        })
        .await;
        let tab = tab_for(&endpoint).await;

        let err = tab.call(enable()).await.unwrap_err();
        match err {
            Error::Command { code, message, .. } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "method not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_close_sends_notify_then_closes() {
        let methods = shared(Vec::<String>::new());
        let methods_srv = methods.clone();

        let endpoint = mock_endpoint(move |request| {
            methods_srv
                .lock()
                .expect("lock")
                .push(request["method"].as_str().unwrap_or_default().to_string());
            empty_success(request)
        })
        .await;
        let tab = tab_for(&endpoint).await;

        tab.close().await;
        assert_eq!(*methods.lock().expect("lock"), ["Target.closeTarget"]);
    }

    proptest! {
        #[test]
        fn prop_id_allocation_never_repeats(count in 1usize..200) {
            let mut last = CommandId::new(0);
            let mut channel_ids = Vec::with_capacity(count);
            for _ in 0..count {
                last = last.next();
                channel_ids.push(last);
            }
            let mut sorted = channel_ids.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), channel_ids.len());
            prop_assert!(channel_ids.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
