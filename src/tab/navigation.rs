//! Navigation sequences.
//!
//! Navigation completion is signaled by two independent events —
//! `Page.frameNavigated` and `Page.loadEventFired` — whose relative
//! order is unspecified. Waiting for a fixed order would deadlock or
//! misfire depending on timing, so the wait checks the event history
//! for the *presence* of both, growing it one message at a time.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::FrameId;
use crate::protocol::{Command, PageCommand};

use super::core::{Channel, Tab};

// ============================================================================
// Constants
// ============================================================================

/// Event carrying the committed frame and its final url.
const FRAME_NAVIGATED: &str = "Page.frameNavigated";

/// Event marking the end of the document load.
const LOAD_EVENT_FIRED: &str = "Page.loadEventFired";

/// Maximum time to wait for both completion signals.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Wire Shapes
// ============================================================================

/// Result payload of `Page.navigate`.
///
/// A rejected navigation carries `errorText` and may omit `frameId`,
/// so the error is checked before the frame id is required.
#[derive(Debug, Deserialize)]
struct NavigateResult {
    #[serde(rename = "frameId", default)]
    frame_id: Option<FrameId>,
    #[serde(rename = "errorText", default)]
    error_text: Option<String>,
}

/// Params of the `Page.frameNavigated` event.
#[derive(Debug, Deserialize)]
struct FrameNavigatedParams {
    frame: NavigatedFrame,
}

#[derive(Debug, Deserialize)]
struct NavigatedFrame {
    id: FrameId,
    url: String,
}

// ============================================================================
// Tab - Navigation
// ============================================================================

impl Tab {
    /// Navigates to a URL and waits for the page to finish loading.
    ///
    /// Returns the navigated frame's identifier. The tab's current url
    /// is updated to the final url reported by the browser, which may
    /// differ from `url` after redirects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Navigation`] if the browser rejects the
    /// navigation; load signals are not awaited in that case.
    pub async fn goto(&self, url: &str) -> Result<FrameId> {
        debug!(target_id = %self.inner.target_id, url = %url, "Navigating");
        self.navigate_sequence(url, None).await
    }

    /// Loads the given HTML into the page and waits for it to settle.
    ///
    /// Navigates to `about:blank`, then replaces the document content
    /// of the navigated frame before waiting for the load signals.
    pub async fn set_html(&self, html: &str) -> Result<FrameId> {
        debug!(
            target_id = %self.inner.target_id,
            html_len = html.len(),
            "Loading HTML content"
        );
        self.navigate_sequence("about:blank", Some(html)).await
    }

    /// The full navigation sequence, under the command lock throughout.
    async fn navigate_sequence(&self, url: &str, html: Option<&str>) -> Result<FrameId> {
        let mut channel = self.inner.channel.lock().await;

        // Make sure lifecycle events are flowing before we navigate.
        self.call_locked(&mut channel, Command::Page(PageCommand::Enable))
            .await?;

        // Events left over from a prior navigation must not be able to
        // satisfy this one's completion check.
        channel.events.reset();

        let result = self
            .call_locked(
                &mut channel,
                Command::Page(PageCommand::Navigate {
                    url: url.to_string(),
                }),
            )
            .await?;
        let nav: NavigateResult = serde_json::from_value(result)
            .map_err(|e| Error::protocol(format!("Malformed navigate result: {e}")))?;

        if let Some(text) = nav.error_text.filter(|t| !t.is_empty()) {
            return Err(Error::navigation(url, text));
        }
        let frame_id = nav
            .frame_id
            .ok_or_else(|| Error::protocol("Navigate result missing frameId"))?;

        if let Some(html) = html {
            self.call_locked(
                &mut channel,
                Command::Page(PageCommand::SetDocumentContent {
                    frame_id: frame_id.clone(),
                    html: html.to_string(),
                }),
            )
            .await?;
        }

        let navigated = match timeout(NAVIGATION_TIMEOUT, wait_for_signals(&mut channel)).await {
            Ok(result) => result?,
            Err(_) => {
                channel.connection.abort();
                return Err(Error::navigation(url, "Timed out waiting for load signals"));
            }
        };

        *self.inner.current_url.lock() = navigated.frame.url.clone();
        debug!(
            target_id = %self.inner.target_id,
            frame_id = %navigated.frame.id,
            url = %navigated.frame.url,
            "Navigation complete"
        );
        Ok(navigated.frame.id)
    }
}

/// Waits until the history holds both completion signals, in whichever
/// order they arrive, then extracts the navigated frame.
async fn wait_for_signals(channel: &mut Channel) -> Result<FrameNavigatedParams> {
    loop {
        if channel.events.contains_method(LOAD_EVENT_FIRED) {
            if let Some(event) = channel.events.find_method(FRAME_NAVIGATED) {
                return serde_json::from_value(event.params.clone()).map_err(|e| {
                    Error::protocol(format!("Malformed {FRAME_NAVIGATED} event: {e}"))
                });
            }
        }
        channel.receive_event().await?;
    }
}

// ============================================================================
// Tests
// ============================================================================
