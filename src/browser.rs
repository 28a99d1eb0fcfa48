//! Browser-instance scope: the capture gate and tab attachment.
//!
//! The browser process itself lives outside this crate. An external
//! supervisor spawns it, discovers its debugging port, creates targets
//! over HTTP and hands the resulting [`TargetDescriptor`]s to
//! [`Browser::attach`]. The supervisor is also responsible for tearing
//! down all tab sessions if the process dies; this core never touches
//! process-wide hooks.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::error::Result;
use crate::identifiers::TargetId;
use crate::tab::Tab;
use crate::transport::Connection;

// ============================================================================
// TargetDescriptor
// ============================================================================

/// Everything needed to attach to one browser tab, as supplied by the
/// external target-creation collaborator.
#[derive(Debug, Clone)]
pub struct TargetDescriptor {
    /// Browser-assigned target id.
    pub target_id: TargetId,
    /// Debugger WebSocket endpoint for this target.
    pub ws_url: String,
    /// Url the target was created with.
    pub url: String,
}

// ============================================================================
// Browser
// ============================================================================

/// Handle scoping tab sessions to one browser instance.
///
/// Owns the capture gate shared by every tab it attaches: screenshot
/// capture models acquisition of the instance's single rendering
/// surface, so captures across its tabs are strictly serialized.
#[derive(Clone)]
pub struct Browser {
    capture_gate: Arc<AsyncMutex<()>>,
}

impl Browser {
    /// Creates a handle for one browser instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capture_gate: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Attaches to a target, establishing its connection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Connection`] if the dial fails.
    pub async fn attach(&self, descriptor: TargetDescriptor) -> Result<Tab> {
        debug!(
            target_id = %descriptor.target_id,
            endpoint = %descriptor.ws_url,
            "Attaching to target"
        );

        let connection = Connection::connect(&descriptor.ws_url).await?;
        Ok(Tab::new(
            descriptor.target_id,
            descriptor.url,
            connection,
            Arc::clone(&self.capture_gate),
        ))
    }
}

impl Default for Browser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
