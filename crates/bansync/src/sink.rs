//! Notification sinks.

use async_trait::async_trait;
use bansync_core::{Result, WebhookPayload};
use bansync_webhook::WebhookClient;

/// An external address notifications are delivered to.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one payload.
    async fn deliver(&self, payload: &WebhookPayload) -> Result<()>;
}

#[async_trait]
impl NotificationSink for WebhookClient {
    async fn deliver(&self, payload: &WebhookPayload) -> Result<()> {
        self.post(payload).await
    }
}
