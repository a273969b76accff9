//! tripcount configuration system.
//!
//! Loaded once from `~/.tripcount/config.toml` (or `--config`), then
//! overlaid with environment variables. Immutable after startup.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TripError};
use crate::types::{Recipient, RecipientEntry, TriggerTime, TripTarget};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TripConfig {
    #[serde(default)]
    pub trip: TripSection,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub recipients: Vec<RecipientEntry>,
}

impl TripConfig {
    /// Load config from the default path (~/.tripcount/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TripError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| TripError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the tripcount home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tripcount")
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TRIP_DATE") {
            self.trip.date = v;
        }
        if let Some(v) = get("TRIP_DESCRIPTION") {
            self.trip.description = v;
        }
        if let Some(v) = get("TRIP_TIMEZONE") {
            self.trip.timezone = v;
        }
        if let Some(v) = get("TZ") {
            self.schedule.timezone = v;
        }
        if let Some(v) = get("SEND_TIME") {
            self.schedule.time = v;
        }
        if let Some(v) = get("TRANSPORT") {
            self.transport.kind = serde_json::from_value(serde_json::Value::String(v.clone()))
                .map_err(|_| TripError::Config(format!("Unknown transport kind '{v}'")))?;
        }

        let twilio = &mut self.transport.twilio;
        if let Some(v) = get("TWILIO_ACCOUNT_SID") {
            twilio.account_sid = v;
        }
        if let Some(v) = get("TWILIO_AUTH_TOKEN") {
            twilio.auth_token = v;
        }
        if let Some(v) = get("TWILIO_SENDER_NUMBER") {
            twilio.sender_number = v;
        }
        if let Some(v) = get("TWILIO_WHATSAPP_NUMBER") {
            twilio.whatsapp_number = v;
        }
        if let Some(v) = get("WHATSAPP_TEMPLATE_ID") {
            twilio.content_sid = v;
        }

        let cloud = &mut self.transport.whatsapp_cloud;
        if let Some(v) = get("WHATSAPP_ACCESS_TOKEN") {
            cloud.access_token = v;
        }
        if let Some(v) = get("WHATSAPP_PHONE_NUMBER_ID") {
            cloud.phone_number_id = v;
        }

        let recipients = get("RECIPIENTS")
            .or_else(|| get("WHATSAPP_RECIPIENTS"))
            .or_else(|| get("SMS_RECIPIENTS"));
        if let Some(json) = recipients {
            self.recipients = parse_recipient_json(&json)?;
        }

        Ok(())
    }

    /// Parsed trip target.
    pub fn trip_target(&self) -> Result<TripTarget> {
        if self.trip.date.trim().is_empty() {
            return Err(TripError::Config("trip.date (TRIP_DATE) is required".into()));
        }
        let tz = parse_timezone(&self.trip.timezone)?;
        TripTarget::parse(&self.trip.date, tz, &self.trip.description)
    }

    /// Timezone the daily trigger and the "today" date are computed in.
    pub fn schedule_timezone(&self) -> Result<Tz> {
        parse_timezone(&self.schedule.timezone)
    }

    pub fn trigger_time(&self) -> Result<TriggerTime> {
        self.schedule.time.parse()
    }

    /// Valid recipients in configured order. Invalid entries are skipped;
    /// an empty result is a configuration error.
    pub fn recipients(&self) -> Result<Vec<Recipient>> {
        if self.recipients.is_empty() {
            return Err(TripError::Config("No recipients configured".into()));
        }
        let valid = Recipient::from_entries(&self.recipients);
        if valid.is_empty() {
            return Err(TripError::Config(format!(
                "None of the {} configured recipients has a valid phone number",
                self.recipients.len()
            )));
        }
        if valid.len() < self.recipients.len() {
            tracing::warn!(
                "⚠️ {} of {} recipients skipped (invalid phone)",
                self.recipients.len() - valid.len(),
                self.recipients.len()
            );
        }
        Ok(valid)
    }

    /// Check everything needed to start. Any error here is fatal.
    pub fn validate(&self) -> Result<()> {
        self.trip_target()?;
        self.schedule_timezone()?;
        self.trigger_time()?;
        self.recipients()?;
        self.transport.validate()
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TripError::Config(format!("Unknown timezone '{name}'")))
}

fn parse_recipient_json(json: &str) -> Result<Vec<RecipientEntry>> {
    serde_json::from_str(json).map_err(|e| {
        TripError::Config(format!(
            "Failed to parse recipients JSON ({e}). Expected [\"+502123456\", {{\"name\": \"Chris\", \"phone\": \"+502789012\"}}]"
        ))
    })
}

fn default_timezone() -> String { "America/Guatemala".into() }
fn default_description() -> String { "Viaje".into() }
fn default_send_time() -> String { "12:30".into() }
fn default_send_delay_ms() -> u64 { 1000 }
fn default_timeout_secs() -> u64 { 30 }

/// The trip being counted down to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSection {
    /// `2025-06-26T09:40:00` (local to `timezone`) or RFC 3339.
    #[serde(default)]
    pub date: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for TripSection {
    fn default() -> Self {
        Self {
            date: String::new(),
            timezone: default_timezone(),
            description: default_description(),
        }
    }
}

/// Daily trigger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Wall-clock `HH:MM` in `timezone`.
    #[serde(default = "default_send_time")]
    pub time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Pause between recipients, to stay under provider rate limits.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time: default_send_time(),
            timezone: default_timezone(),
            send_delay_ms: default_send_delay_ms(),
        }
    }
}

fn default_countdown_template() -> String {
    "Hola! Faltan {days} dias para nuestro viaje: {description}.".into()
}
fn default_hours_template() -> String {
    "Hola! Faltan solo {hours} horas para nuestro viaje: {description}.".into()
}
fn default_today_template() -> String {
    "¡Hoy es el día! Nuestro viaje comienza hoy: {description}.".into()
}
fn default_arrived_template() -> String {
    "¡Buen viaje! ✈️ {description} ya comenzó.".into()
}

/// Message templates. Placeholders: `{days}`, `{hours}`, `{description}`, `{link}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_countdown_template")]
    pub countdown_template: String,
    #[serde(default = "default_hours_template")]
    pub hours_template: String,
    #[serde(default = "default_today_template")]
    pub today_template: String,
    #[serde(default = "default_arrived_template")]
    pub arrived_template: String,
    /// Public countdown page appended to messages when set.
    #[serde(default)]
    pub link: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            countdown_template: default_countdown_template(),
            hours_template: default_hours_template(),
            today_template: default_today_template(),
            arrived_template: default_arrived_template(),
            link: String::new(),
        }
    }
}

/// Which provider delivers the messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    TwilioSms,
    #[default]
    TwilioWhatsapp,
    WhatsappCloud,
    /// Dry run: log instead of sending.
    Log,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,
    /// Client-side timeout for one provider request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub whatsapp_cloud: WhatsAppCloudConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            timeout_secs: default_timeout_secs(),
            twilio: TwilioConfig::default(),
            whatsapp_cloud: WhatsAppCloudConfig::default(),
        }
    }
}

impl TransportConfig {
    /// Check that the selected provider has its credentials.
    pub fn validate(&self) -> Result<()> {
        let missing = |field: &str| {
            Err(TripError::Config(format!(
                "{field} is required for transport '{}'",
                serde_json::to_value(self.kind)
                    .ok()
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_default()
            )))
        };
        match self.kind {
            TransportKind::TwilioSms | TransportKind::TwilioWhatsapp => {
                let t = &self.twilio;
                if t.account_sid.is_empty() {
                    return missing("TWILIO_ACCOUNT_SID");
                }
                if t.auth_token.is_empty() {
                    return missing("TWILIO_AUTH_TOKEN");
                }
                if self.kind == TransportKind::TwilioSms && t.sender_number.is_empty() {
                    return missing("TWILIO_SENDER_NUMBER");
                }
                if self.kind == TransportKind::TwilioWhatsapp && t.whatsapp_sender().is_empty() {
                    return missing("TWILIO_WHATSAPP_NUMBER");
                }
                Ok(())
            }
            TransportKind::WhatsappCloud => {
                let c = &self.whatsapp_cloud;
                if c.access_token.is_empty() {
                    return missing("WHATSAPP_ACCESS_TOKEN");
                }
                if c.phone_number_id.is_empty() {
                    return missing("WHATSAPP_PHONE_NUMBER_ID");
                }
                Ok(())
            }
            TransportKind::Log => Ok(()),
        }
    }
}

/// Twilio Programmable Messaging credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// SMS sender number.
    #[serde(default)]
    pub sender_number: String,
    /// WhatsApp sender number; falls back to `sender_number`.
    #[serde(default)]
    pub whatsapp_number: String,
    /// Approved WhatsApp content template. Empty sends free text.
    #[serde(default)]
    pub content_sid: String,
}

impl TwilioConfig {
    pub fn whatsapp_sender(&self) -> &str {
        if self.whatsapp_number.is_empty() {
            &self.sender_number
        } else {
            &self.whatsapp_number
        }
    }
}

/// WhatsApp Business Cloud API credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WhatsAppCloudConfig {
    /// Facebook Graph API access token
    #[serde(default)]
    pub access_token: String,
    /// WhatsApp Phone Number ID
    #[serde(default)]
    pub phone_number_id: String,
}
