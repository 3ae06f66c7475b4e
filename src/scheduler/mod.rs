pub mod clock;
pub mod engine;
pub mod manager;

pub use clock::{Clock, SystemClock};
pub use engine::ScheduleLoop;
pub use manager::PlaybackScheduler;

use std::fmt;
use std::time::Duration;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not running
    Idle,
    /// Polling until the window opens
    WaitingForWindowStart,
    /// Playing the clip back-to-back
    PlayingBurst,
    /// Random pause between bursts
    PausedBetweenBursts,
    /// Window has closed, rolling over to the next day
    WaitingForWindowEnd,
}

impl SchedulerState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::WaitingForWindowStart => "WAITING",
            Self::PlayingBurst => "PLAYING",
            Self::PausedBetweenBursts => "PAUSED",
            Self::WaitingForWindowEnd => "WINDOW END",
        }
    }
}

/// What the UI shows; recomputed on every transition
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    /// Whether the sink is currently playing
    pub playing: bool,
    pub message: String,
}

impl SchedulerStatus {
    pub fn idle(message: impl Into<String>) -> Self {
        Self {
            state: SchedulerState::Idle,
            playing: false,
            message: message.into(),
        }
    }
}

impl fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.state.label(), self.message)
    }
}

/// Scheduler timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerTiming {
    /// How often window boundaries are checked
    pub poll_interval: Duration,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}
