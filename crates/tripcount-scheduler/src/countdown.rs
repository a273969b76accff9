//! Countdown calculator and message rendering.
//! Pure functions: no clock reads, no I/O.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tripcount_core::config::MessagesConfig;
use tripcount_core::types::{Notice, TripTarget};

const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_HOUR: i64 = 3_600;

/// Remaining time until the trip, in whole days and hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub arrived: bool,
}

/// Which message template a countdown selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Countdown,
    Hours,
    Today,
    Arrived,
}

impl Countdown {
    pub const ARRIVED: Countdown = Countdown {
        days: 0,
        hours: 0,
        arrived: true,
    };

    /// Precedence: arrived, then days, then hours, then "today".
    pub fn template_kind(&self) -> TemplateKind {
        if self.arrived {
            TemplateKind::Arrived
        } else if self.days > 0 {
            TemplateKind::Countdown
        } else if self.hours > 0 {
            TemplateKind::Hours
        } else {
            TemplateKind::Today
        }
    }
}

/// Time remaining from `now` until `target`. Total over any two instants.
pub fn remaining(target: &TripTarget, now: DateTime<Utc>) -> Countdown {
    let delta = target.instant - now;
    if delta <= TimeDelta::zero() {
        return Countdown::ARRIVED;
    }
    // Positive, so truncation is floor.
    let secs = delta.num_seconds();
    Countdown {
        days: secs / SECS_PER_DAY,
        hours: (secs % SECS_PER_DAY) / SECS_PER_HOUR,
        arrived: false,
    }
}

/// Select and interpolate exactly one template.
///
/// Placeholders: `{days}`, `{hours}`, `{description}`, `{link}`. When a link
/// is configured and the template does not place it, it is appended.
pub fn render(countdown: &Countdown, messages: &MessagesConfig, description: &str) -> String {
    let template = match countdown.template_kind() {
        TemplateKind::Arrived => &messages.arrived_template,
        TemplateKind::Countdown => &messages.countdown_template,
        TemplateKind::Hours => &messages.hours_template,
        TemplateKind::Today => &messages.today_template,
    };

    let mut body = template
        .replace("{days}", &countdown.days.to_string())
        .replace("{hours}", &countdown.hours.to_string())
        .replace("{description}", description)
        .replace("{link}", &messages.link);

    if !messages.link.is_empty() && !template.contains("{link}") {
        body.push_str("\n\n🔗 Ver cuenta regresiva: ");
        body.push_str(&messages.link);
    }
    body
}

/// Build the transport payload for a countdown.
pub fn notice(countdown: &Countdown, messages: &MessagesConfig, target: &TripTarget) -> Notice {
    Notice {
        body: render(countdown, messages, &target.description),
        countdown_days: countdown.days,
        description: target.description.clone(),
        link: messages.link.clone(),
    }
}
