//! Error types for tripcount.

use thiserror::Error;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, TripError>;

#[derive(Debug, Error)]
pub enum TripError {
    /// Missing or malformed startup configuration. Fatal.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A recipient entry failed validation and is excluded from runs.
    #[error("Invalid recipient: {0}")]
    Validation(String),

    /// The messaging provider rejected or failed a send.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TripError {
    /// True for errors that abort startup rather than a single send.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TripError::Config(_) | TripError::Toml(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(TripError::Config("missing trip date".into()).is_fatal());
        assert!(!TripError::Transport("429 Too Many Requests".into()).is_fatal());
        assert!(!TripError::Validation("+1".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        let e = TripError::Transport("daily limit reached".into());
        assert_eq!(e.to_string(), "Transport error: daily limit reached");
    }
}
