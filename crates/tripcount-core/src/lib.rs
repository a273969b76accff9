//! # tripcount core
//!
//! Shared error type, configuration, domain types, and the
//! [`Transport`](traits::Transport) seam used by the scheduler and channels.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::TripConfig;
pub use error::{Result, TripError};
pub use traits::Transport;
pub use types::{Notice, Recipient, RecipientEntry, SendReceipt, TriggerTime, TripTarget};
