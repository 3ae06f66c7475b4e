use thiserror::Error;

/// Errors raised while validating schedule input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// Time of day could not be parsed
    #[error("invalid time '{0}', expected HH:MM:SS")]
    InvalidTime(String),

    /// Playback rate must be a finite number above zero
    #[error("invalid playback rate {0}, must be greater than 0")]
    InvalidRate(f64),

    /// Burst policy range is empty or starts at zero
    #[error("invalid {what} range {min}..={max}")]
    InvalidRange {
        what: &'static str,
        min: u64,
        max: u64,
    },

    /// A length of time that must be positive was not
    #[error("invalid {what} {value}")]
    InvalidDuration { what: &'static str, value: f64 },

    /// Clip path is blank
    #[error("clip path is empty")]
    EmptyClip,

    /// The audio sink was lost (the loop task panicked)
    #[error("audio sink is unavailable")]
    SinkUnavailable,
}
