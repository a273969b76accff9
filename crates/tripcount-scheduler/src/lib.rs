//! # tripcount scheduler
//!
//! Idempotent daily countdown notifications.
//!
//! ## Architecture
//! ```text
//! DailyTrigger (sleep until HH:MM in TZ, recomputed after each fire)
//!   └── on fire → DailyScheduler::run_once(now)
//!                   ├── already completed today? → skipped
//!                   ├── countdown::remaining + render (once per run)
//!                   ├── for each recipient, in order:
//!                   │     Transport::send → SendAttemptResult, then delay
//!                   └── success_count > 0 → mark today completed
//! ```
//!
//! Sends are sequential. Run state lives in memory only.

pub mod countdown;
pub mod engine;
pub mod state;
pub mod trigger;

pub use countdown::{Countdown, TemplateKind};
pub use engine::{DailyScheduler, SchedulerConfig, run_daily_loop, spawn_daily_loop};
pub use state::{DailyRunState, DailyRunSummary, SendAttemptResult, SkipReason};
pub use trigger::{DailyTrigger, ManualTrigger, ManualTriggerHandle, Trigger, next_occurrence};
