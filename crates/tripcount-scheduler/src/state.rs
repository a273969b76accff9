//! Run state and run results, the data the scheduler folds sends into.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tripcount_core::error::Result;
use tripcount_core::types::{Recipient, SendReceipt};

/// Outcome of one send to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendAttemptResult {
    pub recipient: Recipient,
    pub success: bool,
    pub error: Option<String>,
    /// Provider-assigned message identifier.
    pub message_id: Option<String>,
}

impl SendAttemptResult {
    /// Fold a transport result into an attempt record. Every error kind is
    /// recorded the same way.
    pub fn from_outcome(recipient: Recipient, outcome: Result<SendReceipt>) -> Self {
        match outcome {
            Ok(receipt) => Self {
                recipient,
                success: true,
                error: None,
                message_id: receipt.message_id,
            },
            Err(e) => Self {
                recipient,
                success: false,
                error: Some(e.to_string()),
                message_id: None,
            },
        }
    }
}

/// The only mutable process-wide state: the last day a run succeeded.
/// In-memory only; a restart forgets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRunState {
    pub last_completed_date: Option<NaiveDate>,
}

impl DailyRunState {
    pub fn is_completed(&self, today: NaiveDate) -> bool {
        self.last_completed_date == Some(today)
    }

    pub(crate) fn mark_completed(&mut self, today: NaiveDate) {
        self.last_completed_date = Some(today);
    }

    pub(crate) fn clear(&mut self) {
        self.last_completed_date = None;
    }
}

/// Why a run did not attempt any sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A run already succeeded today.
    AlreadyCompleted,
    /// Another run is executing right now.
    InFlight,
}

/// Result of one `run_once` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRunSummary {
    /// Calendar date of the run in the scheduler's timezone.
    pub today: NaiveDate,
    pub skipped: bool,
    pub skip_reason: Option<SkipReason>,
    pub success_count: usize,
    pub failure_count: usize,
    /// Failed attempts, in registration order.
    pub failures: Vec<SendAttemptResult>,
    /// Every attempt, in registration order.
    pub attempts: Vec<SendAttemptResult>,
    /// Shutdown stopped the run before every recipient was attempted.
    pub interrupted: bool,
    /// The day was marked complete by this run.
    pub completed: bool,
}

impl DailyRunSummary {
    pub fn skipped(today: NaiveDate, reason: SkipReason) -> Self {
        Self {
            today,
            skipped: true,
            skip_reason: Some(reason),
            success_count: 0,
            failure_count: 0,
            failures: Vec::new(),
            attempts: Vec::new(),
            interrupted: false,
            completed: false,
        }
    }

    /// Aggregate attempts. `completed` is left for the scheduler to decide.
    pub fn from_attempts(today: NaiveDate, attempts: Vec<SendAttemptResult>, interrupted: bool) -> Self {
        let success_count = attempts.iter().filter(|a| a.success).count();
        let failures: Vec<_> = attempts.iter().filter(|a| !a.success).cloned().collect();
        Self {
            today,
            skipped: false,
            skip_reason: None,
            success_count,
            failure_count: failures.len(),
            failures,
            attempts,
            interrupted,
            completed: false,
        }
    }

    /// A full attempt where nothing got through.
    pub fn is_run_failure(&self) -> bool {
        !self.skipped && self.success_count == 0
    }

    /// `YYYY-MM-DD`.
    pub fn today_str(&self) -> String {
        self.today.format("%Y-%m-%d").to_string()
    }
}
