//! Script evaluation and viewport control.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, EmulationCommand, RuntimeCommand};

use super::core::Tab;

// ============================================================================
// Wire Shapes
// ============================================================================

/// Result payload of `Runtime.evaluate`.
#[derive(Debug, Deserialize)]
struct EvaluateResult {
    #[serde(default)]
    result: Option<RemoteObject>,
    #[serde(rename = "exceptionDetails", default)]
    exception_details: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RemoteObject {
    #[serde(default)]
    value: Value,
}

// ============================================================================
// Tab - Script
// ============================================================================

impl Tab {
    /// Evaluates a JavaScript expression in the page and returns the
    /// result by value. Promises are awaited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Script`] if the expression throws.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        debug!(
            target_id = %self.inner.target_id,
            expression_len = expression.len(),
            "Evaluating script"
        );

        let result = self
            .call(Command::Runtime(RuntimeCommand::Evaluate {
                expression: expression.to_string(),
                return_by_value: true,
                await_promise: true,
            }))
            .await?;

        let evaluated: EvaluateResult = serde_json::from_value(result)
            .map_err(|e| Error::protocol(format!("Malformed evaluate result: {e}")))?;

        if let Some(details) = evaluated.exception_details {
            return Err(Error::script(exception_text(&details)));
        }
        Ok(evaluated.result.map(|r| r.value).unwrap_or(Value::Null))
    }

    /// Overrides the viewport metrics.
    pub async fn set_viewport(
        &self,
        width: u32,
        height: u32,
        scale: f64,
        mobile: bool,
    ) -> Result<()> {
        debug!(
            target_id = %self.inner.target_id,
            width,
            height,
            scale,
            "Setting viewport"
        );

        self.call(Command::Emulation(EmulationCommand::SetDeviceMetricsOverride {
            width,
            height,
            device_scale_factor: scale,
            mobile,
        }))
        .await?;
        Ok(())
    }
}

/// Best available description of a thrown exception.
fn exception_text(details: &Value) -> String {
    details
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(Value::as_str)
        .or_else(|| details.get("text").and_then(Value::as_str))
        .unwrap_or("Script threw an exception")
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
