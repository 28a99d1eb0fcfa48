//! Screenshot capture.
//!
//! Capture contends for a single shared rendering surface: bringing a
//! tab to the foreground affects every tab of the same browser
//! instance. The whole bring-to-front → quiesce → capture → re-enable
//! sequence therefore runs under the browser-wide capture gate,
//! acquired *before* the tab's command lock — always in that order, so
//! concurrent captures on different tabs cannot deadlock.

use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::scan::{ScanOutcome, scan_message};
use crate::protocol::{Clip, Command, PageCommand};

use super::core::{Channel, Tab};

// ============================================================================
// ImageFormat
// ============================================================================

/// Image format for screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless, larger file size).
    #[default]
    Png,
    /// JPEG format with quality (0-100).
    Jpeg(u8),
}

impl ImageFormat {
    /// Creates PNG format.
    #[inline]
    #[must_use]
    pub fn png() -> Self {
        Self::Png
    }

    /// Creates JPEG format with quality (0-100).
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.min(100))
    }

    /// Returns the format string for the protocol.
    fn format_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpeg",
        }
    }

    /// Returns the quality value if JPEG.
    fn quality(&self) -> Option<u8> {
        match self {
            Self::Png => None,
            Self::Jpeg(q) => Some(*q),
        }
    }
}

// ============================================================================
// ScreenshotBuilder
// ============================================================================

/// Builder for configuring and capturing screenshots.
///
/// # Example
///
/// ```ignore
/// // Full-viewport PNG
/// let image = tab.screenshot().capture().await?;
///
/// // JPEG of a region
/// let image = tab
///     .screenshot()
///     .jpeg(85)
///     .clip(Clip { x: 0.0, y: 0.0, width: 800.0, height: 600.0, scale: 1.0 })
///     .capture()
///     .await?;
/// ```
pub struct ScreenshotBuilder<'a> {
    tab: &'a Tab,
    format: ImageFormat,
    clip: Option<Clip>,
}

impl<'a> ScreenshotBuilder<'a> {
    /// Creates a new screenshot builder.
    pub(crate) fn new(tab: &'a Tab) -> Self {
        Self {
            tab,
            format: ImageFormat::Png,
            clip: None,
        }
    }

    /// Sets PNG format (default).
    #[must_use]
    pub fn png(mut self) -> Self {
        self.format = ImageFormat::Png;
        self
    }

    /// Sets JPEG format with quality (0-100).
    #[must_use]
    pub fn jpeg(mut self, quality: u8) -> Self {
        self.format = ImageFormat::Jpeg(quality.min(100));
        self
    }

    /// Sets the image format.
    #[must_use]
    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Restricts the capture to a region of the page.
    #[must_use]
    pub fn clip(mut self, clip: Clip) -> Self {
        self.clip = Some(clip);
        self
    }

    /// Captures the screenshot and returns the decoded image bytes.
    ///
    /// Returns `Ok(None)` when the browser answers without image data
    /// (e.g. the capture was rejected); callers must check for the
    /// empty outcome explicitly.
    pub async fn capture(&self) -> Result<Option<Vec<u8>>> {
        let tab = self.tab;
        debug!(
            target_id = %tab.inner.target_id,
            format = ?self.format,
            "Capturing screenshot"
        );

        // Capture gate first, command lock second. Every capture path
        // uses this order.
        let gate = tab.inner.capture_gate.clone();
        let _gate = gate.lock().await;
        let mut channel = tab.inner.channel.lock().await;

        tab.call_locked(&mut channel, Command::Page(PageCommand::BringToFront))
            .await?;
        // Quiesce lifecycle events while the surface is being read.
        tab.call_locked(&mut channel, Command::Page(PageCommand::Disable))
            .await?;

        let command = Command::Page(PageCommand::CaptureScreenshot {
            format: self.format.format_str().to_string(),
            quality: self.format.quality(),
            clip: self.clip,
        });
        let method = command.method();
        let id = channel.send_command(&command).await?;

        let data = match timeout(tab.inner.command_timeout, extract(&mut channel, id, method)).await
        {
            Ok(result) => result?,
            Err(_) => {
                channel.connection.abort();
                return Err(Error::timeout(
                    id,
                    tab.inner.command_timeout.as_millis() as u64,
                ));
            }
        };

        tab.call_locked(&mut channel, Command::Page(PageCommand::Enable))
            .await?;

        debug!(
            target_id = %tab.inner.target_id,
            bytes = data.as_ref().map_or(0, Vec::len),
            "Capture complete"
        );
        Ok(data)
    }
}

/// Drains the connection until the capture response, decoding its
/// payload straight from the wire bytes.
///
/// Intervening events take the ordinary full-parse path into the event
/// history; only the potentially huge response goes through the scan.
async fn extract(channel: &mut Channel, id: CommandId, method: &str) -> Result<Option<Vec<u8>>> {
    loop {
        let bytes = channel.connection.receive().await?;
        match scan_message(&bytes, id, method)? {
            ScanOutcome::Event(event) => channel.events.push(event),
            ScanOutcome::Data(data) => return Ok(Some(data)),
            ScanOutcome::NoData => return Ok(None),
        }
    }
}

// ============================================================================
// Tab - Screenshot
// ============================================================================

impl Tab {
    /// Creates a screenshot builder.
    #[must_use]
    pub fn screenshot(&self) -> ScreenshotBuilder<'_> {
        ScreenshotBuilder::new(self)
    }

    /// Captures a full-viewport PNG screenshot.
    ///
    /// Shorthand for `tab.screenshot().png().capture().await`.
    pub async fn capture_screenshot(&self) -> Result<Option<Vec<u8>>> {
        self.screenshot().png().capture().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{Duration, Instant};

    use futures_util::{SinkExt, StreamExt};
    use serde_json::Value;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::browser::Browser;
    use crate::tab::testkit::{
        Shared, browser_tab_for, empty_success, mock_endpoint, shared, tab_for,
    };

    #[tokio::test]
    async fn test_capture_decodes_payload_and_keeps_events() {
        let endpoint = mock_endpoint(|request| {
            let id = request["id"].as_u64().expect("id");
            match request["method"].as_str() {
                Some("Page.captureScreenshot") => vec![
                    "{\"method\":\"Page.frameResized\",\"params\":{}}".to_string(),
                    "{\"method\":\"Page.frameStoppedLoading\",\"params\":{\"frameId\":\"F1\"}}"
                        .to_string(),
                    format!("{{\"id\":{id},\"result\":{{\"data\":\"aGVsbG8=\"}}}}"),
                ],
                _ => empty_success(request),
            }
        })
        .await;
        let tab = tab_for(&endpoint).await;

        let image = tab.capture_screenshot().await.expect("capture");
        assert_eq!(image, Some(b"hello".to_vec()));

        let channel = tab.inner.channel.lock().await;
        let methods: Vec<&str> = channel
            .events
            .as_slice()
            .iter()
            .map(|e| e.method.as_str())
            .collect();
        assert_eq!(methods, ["Page.frameResized", "Page.frameStoppedLoading"]);
    }

    #[tokio::test]
    async fn test_capture_without_data_is_empty_outcome() {
        let endpoint = mock_endpoint(|request| {
            let id = request["id"].as_u64().expect("id");
            match request["method"].as_str() {
                Some("Page.captureScreenshot") => {
                    vec![format!("{{\"id\":{id},\"result\":{{}}}}")]
                }
                _ => empty_success(request),
            }
        })
        .await;
        let tab = tab_for(&endpoint).await;

        let image = tab.capture_screenshot().await.expect("capture");
        assert_eq!(image, None);
    }

    #[tokio::test]
    async fn test_capture_runs_full_sequence() {
        let methods = shared(Vec::<String>::new());
        let methods_srv = methods.clone();

        let endpoint = mock_endpoint(move |request| {
            let id = request["id"].as_u64().expect("id");
            let method = request["method"].as_str().unwrap_or_default().to_string();
            methods_srv.lock().expect("lock").push(method.clone());
            match method.as_str() {
                "Page.captureScreenshot" => {
                    vec![format!("{{\"id\":{id},\"result\":{{\"data\":\"QUJD\"}}}}")]
                }
                _ => empty_success(request),
            }
        })
        .await;
        let tab = tab_for(&endpoint).await;

        tab.screenshot().jpeg(80).capture().await.expect("capture");
        assert_eq!(
            *methods.lock().expect("lock"),
            [
                "Page.bringToFront",
                "Page.disable",
                "Page.captureScreenshot",
                "Page.enable"
            ]
        );
    }

    /// Endpoint that stalls capture responses so capture intervals are
    /// observable from the outside.
    async fn slow_capture_endpoint(
        tag: usize,
        intervals: Shared<Vec<(usize, Instant, Instant)>>,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let request: Value = serde_json::from_str(&text).expect("json");
                let id = request["id"].as_u64().expect("id");
                if request["method"] == "Page.captureScreenshot" {
                    let start = Instant::now();
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    ws.send(Message::text(format!(
                        "{{\"id\":{id},\"result\":{{\"data\":\"aGVsbG8=\"}}}}"
                    )))
                    .await
                    .expect("send");
                    intervals.lock().expect("lock").push((tag, start, Instant::now()));
                } else {
                    ws.send(Message::text(format!("{{\"id\":{id},\"result\":{{}}}}")))
                        .await
                        .expect("send");
                }
            }
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn test_concurrent_captures_never_overlap() {
        let intervals = shared(Vec::new());
        let browser = Browser::new();

        let tab_a = browser_tab_for(
            &browser,
            &slow_capture_endpoint(0, intervals.clone()).await,
        )
        .await;
        let tab_b = browser_tab_for(
            &browser,
            &slow_capture_endpoint(1, intervals.clone()).await,
        )
        .await;

        let a = tokio::spawn(async move { tab_a.capture_screenshot().await });
        let b = tokio::spawn(async move { tab_b.capture_screenshot().await });
        a.await.expect("join").expect("capture a");
        b.await.expect("join").expect("capture b");

        let intervals = intervals.lock().expect("lock").clone();
        assert_eq!(intervals.len(), 2);
        let (_, start_0, end_0) = intervals[0];
        let (_, start_1, end_1) = intervals[1];
        assert!(
            end_0 <= start_1 || end_1 <= start_0,
            "capture intervals overlap: {intervals:?}"
        );
    }
}
