//! Error types for the pattern library

use thiserror::Error;

/// Pattern data errors
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Sequence '{0}' has no steps")]
    EmptySequence(String),

    #[error("Step strength {0} is outside [0, 1]")]
    InvalidStrength(f32),

    #[error("Step duration {0} is not positive")]
    InvalidDuration(f32),

    #[error("Malformed step '{0}': expected 'strength,duration'")]
    MalformedStep(String),

    #[error("Override parse error: {0}")]
    Overrides(#[from] serde_json::Error),
}

/// Result type alias
pub type PatternResult<T> = Result<T, PatternError>;
