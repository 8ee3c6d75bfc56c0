//! Outbound webhook delivery.
//!
//! The sweep talks to an abstract [`NotificationSink`] so tests can inject
//! fakes; the production implementation posts a Discord-compatible
//! `{"content": message}` payload.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// A failed delivery attempt. Network errors, timeouts, and non-2xx
/// responses are all treated identically by the sweep.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook rejected with status {status}")]
    Rejected { status: reqwest::StatusCode },
}

/// Notification delivery contract.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `message` to `target_url`. Ok means the target accepted it.
    async fn send(&self, target_url: &str, message: &str) -> Result<(), DeliveryError>;
}

/// Webhook sink over HTTP POST.
pub struct WebhookSink {
    client: reqwest::Client,
}

impl WebhookSink {
    /// Build a sink whose requests are capped at `timeout` so one
    /// unreachable target cannot stall a sweep.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, target_url: &str, message: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(target_url)
            .json(&json!({ "content": message }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeliveryError::Rejected {
                status: response.status(),
            });
        }
        Ok(())
    }
}
