use std::time::Duration;

use serde_json::json;
use tracing::info;

use crate::error::{PulseError, Result};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Optional webhook delivery of the finished report text. Transport details
/// end here; the engine only ever hands over a string.
pub struct Webhook {
    url: String,
    user_id: Option<i64>,
}

impl Webhook {
    /// Configured via `PULSE_WEBHOOK_URL` and optional `PULSE_WEBHOOK_USER`.
    /// Returns `None` when no webhook is configured.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("PULSE_WEBHOOK_URL").ok()?;
        let user_id = std::env::var("PULSE_WEBHOOK_USER")
            .ok()
            .and_then(|v| v.parse().ok());
        Some(Self { url, user_id })
    }

    pub fn send(&self, subject: &str, body: &str) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()?;

        let mut payload = json!({ "subject": subject, "message": body });
        if let Some(user_id) = self.user_id {
            payload["user_id"] = json!(user_id);
        }

        let resp = client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| PulseError::TransientNetwork(format!("webhook: {e}")))?;
        if !resp.status().is_success() {
            return Err(PulseError::TransientNetwork(format!(
                "webhook returned {}",
                resp.status()
            )));
        }
        info!("report delivered to webhook");
        Ok(())
    }
}
