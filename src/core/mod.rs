pub mod config;
pub mod error;
pub mod window;

pub use config::{BurstPolicy, PlaybackConfig, PlaybackRate};
pub use error::ScheduleError;
pub use window::{format_span, ClockTime, DailyWindow, ScheduleWindow};
