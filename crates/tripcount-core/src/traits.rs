//! Trait seams between the scheduler and delivery providers.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Notice, Recipient, SendReceipt};

/// Notification Transport: delivers one message to one recipient.
///
/// Implementations may fail for network, authentication, or rate-limit
/// reasons. Callers treat every failure the same way.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name (e.g., "twilio_sms", "whatsapp_cloud").
    fn name(&self) -> &str;

    /// Send `message` to `recipient`.
    async fn send(&self, recipient: &Recipient, message: &Notice) -> Result<SendReceipt>;
}
