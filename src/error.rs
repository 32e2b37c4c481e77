//! Error types for the lead wizard.

use std::time::Duration;

use crate::wizard::state::Step;
use crate::wizard::validator::ValidationState;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Step navigation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StepError {
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(ValidationState),

    #[error("No forward transition from step {0}")]
    NoForwardTransition(Step),
}

/// Submission errors. Every variant is recoverable: the draft is kept and
/// the user may retry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmissionError {
    #[error("A submission is already in flight")]
    InFlight,

    #[error("Relay endpoint responded with HTTP {status}")]
    Status { status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Relay endpoint did not respond within {0:?}")]
    Timeout(Duration),
}

/// Result type alias for the wizard.
pub type Result<T> = std::result::Result<T, Error>;
