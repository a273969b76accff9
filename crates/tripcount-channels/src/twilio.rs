//! Twilio Programmable Messaging transport for SMS and WhatsApp.
//!
//! Both go through `POST /2010-04-01/Accounts/{sid}/Messages.json` with HTTP
//! basic auth. WhatsApp addresses carry a `whatsapp:` prefix and may use an
//! approved content template instead of free text.

use async_trait::async_trait;
use serde::Deserialize;
use tripcount_core::config::TwilioConfig;
use tripcount_core::error::{Result, TripError};
use tripcount_core::traits::Transport;
use tripcount_core::types::{Notice, Recipient, SendReceipt, WHATSAPP_PREFIX};

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Which Twilio product to send through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwilioMode {
    Sms,
    WhatsApp,
}

/// Twilio message resource (only the fields we read).
#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Twilio REST error body.
#[derive(Debug, Deserialize)]
struct TwilioApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

pub struct TwilioTransport {
    config: TwilioConfig,
    mode: TwilioMode,
    client: reqwest::Client,
    base_url: String,
}

impl TwilioTransport {
    pub fn new(config: TwilioConfig, mode: TwilioMode, client: reqwest::Client) -> Self {
        Self {
            config,
            mode,
            client,
            base_url: TWILIO_API_BASE.to_string(),
        }
    }

    /// Point at a different API host (used by contract tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        )
    }

    /// Form fields for one message.
    fn form(&self, recipient: &Recipient, message: &Notice) -> Vec<(&'static str, String)> {
        match self.mode {
            TwilioMode::Sms => vec![
                ("From", self.config.sender_number.clone()),
                ("To", recipient.phone.clone()),
                ("Body", message.body.clone()),
            ],
            TwilioMode::WhatsApp => {
                let mut form = vec![
                    ("From", whatsapp_address(self.config.whatsapp_sender())),
                    ("To", whatsapp_address(&recipient.phone)),
                ];
                if self.config.content_sid.is_empty() {
                    form.push(("Body", message.body.clone()));
                } else {
                    form.push(("ContentSid", self.config.content_sid.clone()));
                    form.push(("ContentVariables", content_variables(recipient, message)));
                }
                form
            }
        }
    }
}

fn whatsapp_address(phone: &str) -> String {
    if phone.starts_with(WHATSAPP_PREFIX) {
        phone.to_string()
    } else {
        format!("{WHATSAPP_PREFIX}{phone}")
    }
}

/// Template variables: 1 = name, 2 = days left, 3 = description (+ link).
pub fn content_variables(recipient: &Recipient, message: &Notice) -> String {
    let description = if message.link.is_empty() {
        message.description.clone()
    } else {
        format!("{}\n\n🔗 Ver cuenta regresiva: {}", message.description, message.link)
    };
    serde_json::json!({
        "1": recipient.name,
        "2": message.countdown_days.to_string(),
        "3": description,
    })
    .to_string()
}

#[async_trait]
impl Transport for TwilioTransport {
    fn name(&self) -> &str {
        match self.mode {
            TwilioMode::Sms => "twilio_sms",
            TwilioMode::WhatsApp => "twilio_whatsapp",
        }
    }

    async fn send(&self, recipient: &Recipient, message: &Notice) -> Result<SendReceipt> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&self.form(recipient, message))
            .send()
            .await
            .map_err(|e| TripError::Transport(format!("Twilio request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TwilioApiError>(&text) {
                Ok(err) => match err.code {
                    Some(code) => format!("{code}: {}", err.message),
                    None => err.message,
                },
                Err(_) => text,
            };
            return Err(if status == reqwest::StatusCode::UNAUTHORIZED {
                TripError::AuthFailed(format!("Twilio rejected credentials: {detail}"))
            } else {
                TripError::Transport(format!("Twilio API error {status}: {detail}"))
            });
        }

        let msg: TwilioMessage = response
            .json()
            .await
            .map_err(|e| TripError::Transport(format!("Invalid Twilio response: {e}")))?;

        tracing::debug!(
            "Twilio message {} → {} ({})",
            msg.sid,
            recipient.phone,
            msg.status.as_deref().unwrap_or("unknown")
        );
        Ok(SendReceipt::with_id(msg.sid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "secret".into(),
            sender_number: "+15005550006".into(),
            whatsapp_number: String::new(),
            content_sid: String::new(),
        }
    }

    fn notice() -> Notice {
        Notice {
            body: "Hola! Faltan 6 dias".into(),
            countdown_days: 6,
            description: "Viaje".into(),
            link: "https://example.org".into(),
        }
    }

    fn chris() -> Recipient {
        Recipient::new("Chris", None, "+50254775800").unwrap()
    }

    fn field<'a>(form: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_sms_form() {
        let t = TwilioTransport::new(config(), TwilioMode::Sms, reqwest::Client::new());
        let form = t.form(&chris(), &notice());
        assert_eq!(field(&form, "From"), Some("+15005550006"));
        assert_eq!(field(&form, "To"), Some("+50254775800"));
        assert_eq!(field(&form, "Body"), Some("Hola! Faltan 6 dias"));
    }

    #[test]
    fn test_whatsapp_free_text_form() {
        let t = TwilioTransport::new(config(), TwilioMode::WhatsApp, reqwest::Client::new());
        let form = t.form(&chris(), &notice());
        assert_eq!(field(&form, "From"), Some("whatsapp:+15005550006"));
        assert_eq!(field(&form, "To"), Some("whatsapp:+50254775800"));
        assert!(field(&form, "ContentSid").is_none());
    }

    #[test]
    fn test_whatsapp_template_form() {
        let mut cfg = config();
        cfg.whatsapp_number = "whatsapp:+14155238886".into();
        cfg.content_sid = "HX42".into();
        let t = TwilioTransport::new(cfg, TwilioMode::WhatsApp, reqwest::Client::new());
        let form = t.form(&chris(), &notice());
        assert_eq!(field(&form, "From"), Some("whatsapp:+14155238886"));
        assert_eq!(field(&form, "ContentSid"), Some("HX42"));
        assert!(field(&form, "Body").is_none());

        let vars: serde_json::Value =
            serde_json::from_str(field(&form, "ContentVariables").unwrap()).unwrap();
        assert_eq!(vars["1"], "Chris");
        assert_eq!(vars["2"], "6");
        assert_eq!(vars["3"], "Viaje\n\n🔗 Ver cuenta regresiva: https://example.org");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let t = TwilioTransport::new(config(), TwilioMode::Sms, reqwest::Client::new())
            .with_base_url("http://127.0.0.1:9/");
        assert_eq!(
            t.messages_url(),
            "http://127.0.0.1:9/2010-04-01/Accounts/AC123/Messages.json"
        );
    }
}
