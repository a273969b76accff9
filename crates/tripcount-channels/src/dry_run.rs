//! Dry-run transport: logs instead of sending.

use async_trait::async_trait;
use tripcount_core::error::Result;
use tripcount_core::traits::Transport;
use tripcount_core::types::{Notice, Recipient, SendReceipt};

#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, recipient: &Recipient, message: &Notice) -> Result<SendReceipt> {
        let id = format!("dry-{}", uuid::Uuid::new_v4().simple());
        tracing::info!("📝 [dry-run] → {recipient}: {}", message.body);
        Ok(SendReceipt::with_id(id))
    }
}
