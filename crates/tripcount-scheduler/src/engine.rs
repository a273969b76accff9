//! Daily notification scheduler: the idempotent run and its loop.
//!
//! ```text
//! Idle-Unsent ──run_once, success_count > 0──▶ Completed-Today
//!      ▲  │                                          │
//!      │  └──run_once, success_count == 0──┐         │ date changes
//!      └───────────────────────────────────┴─────────┘
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;
use tripcount_core::config::{MessagesConfig, TripConfig};
use tripcount_core::error::Result;
use tripcount_core::traits::Transport;
use tripcount_core::types::{Recipient, TriggerTime, TripTarget};

use crate::countdown;
use crate::state::{DailyRunState, DailyRunSummary, SendAttemptResult, SkipReason};
use crate::trigger::Trigger;

/// Run summaries kept for inspection (in-memory ring buffer).
const HISTORY_LIMIT: usize = 30;

/// When and where the daily run fires.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub trigger_time: TriggerTime,
    /// Timezone for the trigger and for "today".
    pub timezone: Tz,
    /// Pause between recipients, for provider rate limits.
    pub send_delay: Duration,
}

impl SchedulerConfig {
    pub fn from_config(config: &TripConfig) -> Result<Self> {
        Ok(Self {
            trigger_time: config.trigger_time()?,
            timezone: config.schedule_timezone()?,
            send_delay: Duration::from_millis(config.schedule.send_delay_ms),
        })
    }
}

/// Owns the daily run state and drives sends through a [`Transport`].
pub struct DailyScheduler {
    config: SchedulerConfig,
    target: TripTarget,
    messages: MessagesConfig,
    recipients: Vec<Recipient>,
    transport: Arc<dyn Transport>,
    state: Mutex<DailyRunState>,
    in_flight: AtomicBool,
    cancel: CancellationToken,
    history: Mutex<VecDeque<DailyRunSummary>>,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DailyScheduler {
    pub fn new(
        config: SchedulerConfig,
        target: TripTarget,
        messages: MessagesConfig,
        recipients: Vec<Recipient>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            target,
            messages,
            recipients,
            transport,
            state: Mutex::new(DailyRunState::default()),
            in_flight: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Use an externally owned shutdown token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn target(&self) -> &TripTarget {
        &self.target
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ask the scheduler to stop. An in-flight send finishes; no new one starts.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Snapshot of the run state.
    pub fn state(&self) -> DailyRunState {
        self.lock_state().clone()
    }

    /// Forget today's completion (testing / administrative override).
    pub fn reset(&self) {
        self.lock_state().clear();
        tracing::info!("🔄 Daily run state reset");
    }

    /// Recent run summaries, oldest first.
    pub fn history(&self) -> Vec<DailyRunSummary> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Whether a run is executing right now.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Calendar date of `now` in the scheduler's timezone.
    pub fn today(&self, now: DateTime<Utc>) -> chrono::NaiveDate {
        now.with_timezone(&self.config.timezone).date_naive()
    }

    /// Run the daily notification once, unless today is already done.
    ///
    /// Every recipient is attempted exactly once, in registration order. The
    /// day is marked complete only if at least one send succeeded.
    pub async fn run_once(&self, now: DateTime<Utc>) -> DailyRunSummary {
        let today = self.today(now);

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!("⏳ A run is already in progress ({today}). Skipping.");
            return DailyRunSummary::skipped(today, SkipReason::InFlight);
        };

        if self.lock_state().is_completed(today) {
            tracing::info!("📅 Messages already sent today ({today}). Skipping execution.");
            return DailyRunSummary::skipped(today, SkipReason::AlreadyCompleted);
        }

        let countdown = countdown::remaining(&self.target, now);
        let notice = countdown::notice(&countdown, &self.messages, &self.target);

        tracing::info!("📨 Sending daily reminders via {}...", self.transport.name());
        tracing::info!("📅 Today: {today}");
        tracing::info!(
            "📊 Remaining: {} days, {} hours{}",
            countdown.days,
            countdown.hours,
            if countdown.arrived { " (trip started)" } else { "" }
        );

        let mut attempts = Vec::with_capacity(self.recipients.len());
        let mut interrupted = false;

        for (i, recipient) in self.recipients.iter().enumerate() {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }
            if i > 0 && !self.config.send_delay.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.send_delay) => {}
                }
            }

            tracing::info!("📱 Sending to: {recipient}");
            let outcome = self.transport.send(recipient, &notice).await;
            let attempt = SendAttemptResult::from_outcome(recipient.clone(), outcome);
            match (&attempt.error, &attempt.message_id) {
                (Some(e), _) => tracing::error!("❌ Error sending to {}: {e}", recipient.phone),
                (None, Some(id)) => tracing::info!("✅ Message sent to {} - ID: {id}", recipient.phone),
                (None, None) => tracing::info!("✅ Message sent to {}", recipient.phone),
            }
            attempts.push(attempt);
        }

        if interrupted {
            tracing::warn!(
                "🛑 Shutdown requested: {} of {} recipients not attempted",
                self.recipients.len() - attempts.len(),
                self.recipients.len()
            );
        }

        let mut summary = DailyRunSummary::from_attempts(today, attempts, interrupted);
        tracing::info!(
            "📊 Summary: {} sent, {} failed",
            summary.success_count,
            summary.failure_count
        );

        if summary.success_count > 0 {
            self.lock_state().mark_completed(today);
            summary.completed = true;
            tracing::info!("✅ Daily messages completed for {today}");
        } else {
            tracing::warn!("⚠️ No messages sent successfully. Will retry in next execution.");
        }

        self.record(summary.clone());
        summary
    }

    fn lock_state(&self) -> MutexGuard<'_, DailyRunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, summary: DailyRunSummary) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push_back(summary);
        while history.len() > HISTORY_LIMIT {
            history.pop_front();
        }
    }
}

/// Drive `scheduler` from `trigger` until the trigger ends or shutdown.
pub async fn run_daily_loop<T: Trigger>(scheduler: Arc<DailyScheduler>, mut trigger: T) {
    let cancel = scheduler.cancellation_token();
    tracing::info!(
        "⏰ Scheduler started: daily at {} ({}), {} recipients",
        scheduler.config().trigger_time,
        scheduler.config().timezone,
        scheduler.recipients().len()
    );

    while let Some(fired_at) = trigger.next_fire(&cancel).await {
        tracing::info!("⏰ Trigger fired at {fired_at}");
        let summary = scheduler.run_once(fired_at).await;
        if summary.is_run_failure() {
            for failure in &summary.failures {
                tracing::warn!(
                    "⚠️ [{}] {}: {}",
                    summary.today_str(),
                    failure.recipient,
                    failure.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        if cancel.is_cancelled() {
            break;
        }
    }

    tracing::info!("🛑 Scheduler stopped");
}

/// Spawn [`run_daily_loop`] as a background tokio task.
pub fn spawn_daily_loop<T>(scheduler: Arc<DailyScheduler>, trigger: T) -> tokio::task::JoinHandle<()>
where
    T: Trigger + 'static,
{
    tokio::spawn(run_daily_loop(scheduler, trigger))
}
