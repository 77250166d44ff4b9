//! POST each message as JSON to a configured endpoint.

use std::time::Duration;

use serde::Serialize;

use crate::{LifecycleError, LifecycleResult};

use super::Notifier;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    recipient: &'a str,
    subject: &'a str,
    body: &'a str,
}

pub struct WebhookNotifier {
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            timeout,
        }
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> LifecycleResult<()> {
        let payload = WebhookPayload {
            recipient,
            subject,
            body,
        };
        let failed = |reason: String| LifecycleError::Notification {
            recipient: recipient.to_string(),
            reason,
        };
        let bytes = serde_json::to_vec(&payload)?;

        ureq::post(&self.url)
            .header("content-type", "application/json")
            .config()
            .timeout_global(Some(self.timeout))
            .build()
            .send(bytes.as_slice())
            .map_err(|e| failed(e.to_string()))?;

        tracing::debug!(recipient = recipient, url = %self.url, "Webhook delivered");
        Ok(())
    }
}
