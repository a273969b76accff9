//! Recurring wall-clock trigger.
//!
//! The next fire time is recomputed from the local calendar after every
//! fire instead of adding a fixed 24h interval, so DST shifts in the
//! configured timezone move the UTC instant but not the local time.

use async_trait::async_trait;
use chrono::{DateTime, Days, LocalResult, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tripcount_core::types::TriggerTime;

/// Longest DST gap we walk across when the trigger time does not exist.
const MAX_GAP_MINUTES: i64 = 180;

/// Source of fire events for the daily loop.
#[async_trait]
pub trait Trigger: Send {
    /// Wait for the next fire. Returns the fire instant, or `None` once
    /// `cancel` fires or the trigger is exhausted.
    async fn next_fire(&mut self, cancel: &CancellationToken) -> Option<DateTime<Utc>>;
}

/// First instant strictly after `after` whose local time in `tz` is `time`.
///
/// Ambiguous local times (fall-back) resolve to the earlier instant.
/// Nonexistent local times (spring-forward gap) move to the first valid
/// minute after the gap.
pub fn next_occurrence(after: DateTime<Utc>, time: TriggerTime, tz: Tz) -> DateTime<Utc> {
    let start = after.with_timezone(&tz).date_naive();
    for offset in 0..3 {
        let Some(date) = start.checked_add_days(Days::new(offset)) else {
            break;
        };
        if let Some(candidate) = resolve_local(date, time, tz)
            && candidate > after
        {
            return candidate;
        }
    }
    // Unreachable for real zones; keep the loop alive regardless.
    tracing::warn!("⚠️ Could not resolve {time} in {tz} after {after}, retrying in 24h");
    after + TimeDelta::days(1)
}

fn resolve_local(date: NaiveDate, time: TriggerTime, tz: Tz) -> Option<DateTime<Utc>> {
    let mut naive = date.and_hms_opt(time.hour, time.minute, 0)?;
    for _ in 0..=MAX_GAP_MINUTES {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(t) => return Some(t.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
            LocalResult::None => naive += TimeDelta::minutes(1),
        }
    }
    None
}

/// Fires once a day at a wall-clock time in a timezone.
pub struct DailyTrigger {
    time: TriggerTime,
    timezone: Tz,
    last_fired: Option<DateTime<Utc>>,
}

impl DailyTrigger {
    pub fn new(time: TriggerTime, timezone: Tz) -> Self {
        Self {
            time,
            timezone,
            last_fired: None,
        }
    }

    /// Next fire instant as seen from `now`, never repeating the last fire.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let after = match self.last_fired {
            Some(last) if last > now => last,
            _ => now,
        };
        next_occurrence(after, self.time, self.timezone)
    }
}

#[async_trait]
impl Trigger for DailyTrigger {
    async fn next_fire(&mut self, cancel: &CancellationToken) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        let next = self.next_after(now);
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(
            "⏰ Next run at {} ({} {}), in {}m",
            next.with_timezone(&self.timezone).format("%Y-%m-%d %H:%M %Z"),
            self.time,
            self.timezone,
            wait.as_secs() / 60
        );

        tokio::select! {
            _ = cancel.cancelled() => None,
            _ = tokio::time::sleep(wait) => {
                self.last_fired = Some(next);
                Some(next)
            }
        }
    }
}

/// Trigger driven by explicit `fire` calls. Used for tests and
/// administrative pokes.
pub struct ManualTrigger {
    rx: mpsc::UnboundedReceiver<DateTime<Utc>>,
}

/// Sending half of a [`ManualTrigger`]. Dropping every handle exhausts the trigger.
#[derive(Clone)]
pub struct ManualTriggerHandle {
    tx: mpsc::UnboundedSender<DateTime<Utc>>,
}

impl ManualTrigger {
    pub fn new() -> (Self, ManualTriggerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ManualTriggerHandle { tx })
    }
}

impl ManualTriggerHandle {
    /// Fire with the given instant as "now". Returns false if the trigger is gone.
    pub fn fire(&self, at: DateTime<Utc>) -> bool {
        self.tx.send(at).is_ok()
    }
}

#[async_trait]
impl Trigger for ManualTrigger {
    async fn next_fire(&mut self, cancel: &CancellationToken) -> Option<DateTime<Utc>> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            at = self.rx.recv() => at,
        }
    }
}
