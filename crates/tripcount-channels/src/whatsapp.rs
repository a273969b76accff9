//! WhatsApp Business Cloud API transport.
//!
//! Uses the official WhatsApp Business Platform (Cloud API) for messaging.
//! Requires: Access Token + Phone Number ID from Meta Business Suite.

use async_trait::async_trait;
use tripcount_core::config::WhatsAppCloudConfig;
use tripcount_core::error::{Result, TripError};
use tripcount_core::traits::Transport;
use tripcount_core::types::{Notice, Recipient, SendReceipt};

const GRAPH_API_BASE: &str = "https://graph.facebook.com";
const GRAPH_API_VERSION: &str = "v21.0";

/// WhatsApp Business transport implementation.
pub struct WhatsAppCloudTransport {
    config: WhatsAppCloudConfig,
    client: reqwest::Client,
    base_url: String,
}

impl WhatsAppCloudTransport {
    pub fn new(config: WhatsAppCloudConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            base_url: GRAPH_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn phone_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.base_url, GRAPH_API_VERSION, self.config.phone_number_id
        )
    }

    /// Check the token against the configured phone number.
    pub async fn verify(&self) -> Result<()> {
        let response = self
            .client
            .get(self.phone_url())
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| TripError::Transport(format!("WhatsApp verification failed: {e}")))?;

        if response.status().is_success() {
            tracing::info!(
                "WhatsApp Business: verified (phone_id={})",
                self.config.phone_number_id
            );
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(TripError::AuthFailed(format!(
                "WhatsApp token verification failed: {text}"
            )))
        }
    }

    /// Send a text message. Returns the WhatsApp message id.
    async fn send_text_message(&self, to: &str, text: &str) -> Result<String> {
        let url = format!("{}/messages", self.phone_url());

        // Cloud API wants the number without the leading '+'.
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to.trim_start_matches('+'),
            "type": "text",
            "text": {
                "preview_url": true,
                "body": text
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TripError::Transport(format!("WhatsApp API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(if status == reqwest::StatusCode::UNAUTHORIZED {
                TripError::AuthFailed(format!("WhatsApp API error {status}: {error_text}"))
            } else {
                TripError::Transport(format!("WhatsApp API error {status}: {error_text}"))
            });
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TripError::Transport(format!("Invalid WhatsApp response: {e}")))?;

        let msg_id = result["messages"][0]["id"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!("WhatsApp message sent: {} → {}", msg_id, to);
        Ok(msg_id)
    }
}

#[async_trait]
impl Transport for WhatsAppCloudTransport {
    fn name(&self) -> &str {
        "whatsapp_cloud"
    }

    async fn send(&self, recipient: &Recipient, message: &Notice) -> Result<SendReceipt> {
        let id = self.send_text_message(&recipient.phone, &message.body).await?;
        Ok(SendReceipt::with_id(id))
    }
}
