//! # tripcount channels
//! Notification transports behind [`tripcount_core::Transport`].

pub mod dry_run;
pub mod twilio;
pub mod whatsapp;

use std::sync::Arc;
use std::time::Duration;

use tripcount_core::config::{TransportConfig, TransportKind};
use tripcount_core::error::Result;
use tripcount_core::traits::Transport;

pub use dry_run::LogTransport;
pub use twilio::{TwilioMode, TwilioTransport};
pub use whatsapp::WhatsAppCloudTransport;

/// HTTP client shared by a transport. The timeout bounds a hung send.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tripcount/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Build the configured transport. Credentials are checked first.
pub fn build_transport(config: &TransportConfig) -> Result<Arc<dyn Transport>> {
    config.validate()?;
    let client = || http_client(Duration::from_secs(config.timeout_secs));
    let transport: Arc<dyn Transport> = match config.kind {
        TransportKind::TwilioSms => Arc::new(TwilioTransport::new(
            config.twilio.clone(),
            TwilioMode::Sms,
            client()?,
        )),
        TransportKind::TwilioWhatsapp => Arc::new(TwilioTransport::new(
            config.twilio.clone(),
            TwilioMode::WhatsApp,
            client()?,
        )),
        TransportKind::WhatsappCloud => Arc::new(WhatsAppCloudTransport::new(
            config.whatsapp_cloud.clone(),
            client()?,
        )),
        TransportKind::Log => Arc::new(LogTransport),
    };
    tracing::info!("📡 Transport: {}", transport.name());
    Ok(transport)
}
