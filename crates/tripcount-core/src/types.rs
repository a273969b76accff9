//! Domain types shared by the scheduler and the transports.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TripError};

/// International phone format: `+` followed by 2-15 digits.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{2,15}$").expect("static phone regex"));

/// Prefix some providers put in front of WhatsApp addresses.
pub const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Name used when a recipient entry carries only an address.
pub const DEFAULT_RECIPIENT_NAME: &str = "Amigo";

/// Check a destination address against the international phone format.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// A configured notification destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    /// E.164-like address, always `+<digits>`.
    pub phone: String,
}

impl Recipient {
    /// Build a recipient, validating the phone address.
    pub fn new(name: &str, last_name: Option<&str>, phone: &str) -> Result<Self> {
        let phone = phone.trim();
        let phone = phone.strip_prefix(WHATSAPP_PREFIX).unwrap_or(phone);
        if !is_valid_phone(phone) {
            return Err(TripError::Validation(format!(
                "'{phone}' is not a +<country><subscriber> phone number"
            )));
        }
        let name = name.trim();
        Ok(Self {
            name: if name.is_empty() {
                DEFAULT_RECIPIENT_NAME.to_string()
            } else {
                name.to_string()
            },
            last_name: last_name
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            phone: phone.to_string(),
        })
    }

    /// "First Last", or just the first name.
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.name, last),
            None => self.name.clone(),
        }
    }

    /// Validate raw entries in order, skipping the invalid ones with a warning.
    pub fn from_entries(entries: &[RecipientEntry]) -> Vec<Recipient> {
        let mut recipients = Vec::with_capacity(entries.len());
        for entry in entries {
            match Recipient::try_from(entry) {
                Ok(r) => recipients.push(r),
                Err(e) => tracing::warn!("⚠️ Skipping recipient {:?}: {e}", entry),
            }
        }
        recipients
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.phone)
    }
}

/// A recipient as written in configuration: a bare address or a contact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipientEntry {
    /// `"+50212345678"` or `"whatsapp:+50212345678"`.
    Address(String),
    Contact {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        last_name: Option<String>,
        phone: String,
    },
}

impl TryFrom<&RecipientEntry> for Recipient {
    type Error = TripError;

    fn try_from(entry: &RecipientEntry) -> Result<Self> {
        match entry {
            RecipientEntry::Address(phone) => Recipient::new(DEFAULT_RECIPIENT_NAME, None, phone),
            RecipientEntry::Contact {
                name,
                last_name,
                phone,
            } => Recipient::new(
                name.as_deref().unwrap_or(DEFAULT_RECIPIENT_NAME),
                last_name.as_deref(),
                phone,
            ),
        }
    }
}

/// The trip being counted down to.
#[derive(Debug, Clone, PartialEq)]
pub struct TripTarget {
    pub instant: DateTime<Utc>,
    pub timezone: Tz,
    pub description: String,
}

impl TripTarget {
    /// Parse the trip date.
    ///
    /// Accepts RFC 3339 (`2025-06-26T09:40:00-06:00`) or a naive local
    /// date-time (`2025-06-26T09:40:00`, `2025-06-26 09:40`) interpreted in `timezone`.
    pub fn parse(date: &str, timezone: Tz, description: &str) -> Result<Self> {
        let date = date.trim();
        let instant = if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
            dt.with_timezone(&Utc)
        } else {
            let naive = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(date, fmt).ok())
                .ok_or_else(|| TripError::Config(format!("Unrecognised trip date: '{date}'")))?;
            timezone
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| {
                    TripError::Config(format!("Trip date '{date}' does not exist in {timezone}"))
                })?
                .with_timezone(&Utc)
        };
        Ok(Self {
            instant,
            timezone,
            description: description.to_string(),
        })
    }
}

/// What a transport is asked to deliver for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    /// Fully rendered message text.
    pub body: String,
    /// Whole days remaining; used by providers with structured templates.
    pub countdown_days: i64,
    pub description: String,
    /// Public countdown page, may be empty.
    #[serde(default)]
    pub link: String,
}

/// Provider acknowledgement for a successful send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

impl SendReceipt {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            message_id: Some(id.into()),
        }
    }
}

/// Wall-clock time of day the daily run fires, `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerTime {
    pub hour: u32,
    pub minute: u32,
}

impl TriggerTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(TripError::Config(format!(
                "Trigger time {hour:02}:{minute:02} is out of range"
            )));
        }
        Ok(Self { hour, minute })
    }
}

impl FromStr for TriggerTime {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || TripError::Config(format!("Expected HH:MM trigger time, got '{s}'"));
        let (h, m) = s.trim().split_once(':').ok_or_else(bad)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(bad());
        }
        let hour = h.parse().map_err(|_| bad())?;
        let minute = m.parse().map_err(|_| bad())?;
        TriggerTime::new(hour, minute)
    }
}

impl fmt::Display for TriggerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
