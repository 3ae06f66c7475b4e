use crate::core::error::ScheduleError;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A time of day with one-second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    /// Build from hours, minutes and seconds
    #[cfg(test)]
    pub fn from_hms(hour: u32, min: u32, sec: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, min, sec).map(Self)
    }

    /// Parse `HH:MM:SS`, or `HH:MM` with seconds defaulting to zero
    pub fn parse(text: &str) -> Result<Self, ScheduleError> {
        let trimmed = text.trim();
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
            .map_err(|_| ScheduleError::InvalidTime(text.to_string()))?;

        // chrono accepts :60 as a leap second
        if time.nanosecond() >= 1_000_000_000 {
            return Err(ScheduleError::InvalidTime(text.to_string()));
        }

        Ok(Self(time))
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

impl FromStr for ClockTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Daily start/end clock times during which playback may occur
///
/// When `end <= start` the window crosses midnight and ends on the
/// following day. Equal bounds therefore describe a full 24 hour window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl ScheduleWindow {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// Parse both bounds; fails on the first malformed one
    pub fn parse(start: &str, end: &str) -> Result<Self, ScheduleError> {
        Ok(Self::new(ClockTime::parse(start)?, ClockTime::parse(end)?))
    }

    pub fn crosses_midnight(&self) -> bool {
        self.end <= self.start
    }

    /// Effective length of one occurrence of the window
    pub fn duration(&self) -> Duration {
        let span = self.end.as_naive() - self.start.as_naive();
        if self.crosses_midnight() {
            span + Duration::days(1)
        } else {
            span
        }
    }

    /// The occurrence of this window that starts on `date`
    pub fn on(&self, date: NaiveDate) -> DailyWindow {
        let start = date.and_time(self.start.as_naive());
        let mut end = date.and_time(self.end.as_naive());
        if end <= start {
            end += Duration::days(1);
        }
        DailyWindow { start, end }
    }
}

impl Default for ScheduleWindow {
    /// 07:00:00 to 01:00:00 the next day
    fn default() -> Self {
        Self::parse("07:00:00", "01:00:00").expect("default window is valid")
    }
}

impl fmt::Display for ScheduleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// Render a span as `18h00m`
pub fn format_span(span: Duration) -> String {
    let secs = span.num_seconds();
    format!("{}h{:02}m", secs / 3600, secs / 60 % 60)
}

/// One concrete occurrence of a [`ScheduleWindow`] in local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DailyWindow {
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.start <= now && now < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Move both bounds forward by one calendar day
    pub fn advance_day(&mut self) {
        self.start += Duration::days(1);
        self.end += Duration::days(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(ClockTime::parse("07:00:00").unwrap(), ClockTime::from_hms(7, 0, 0).unwrap());
        assert_eq!(ClockTime::parse(" 23:59:59 ").unwrap(), ClockTime::from_hms(23, 59, 59).unwrap());
        assert_eq!(ClockTime::parse("18:30").unwrap(), ClockTime::from_hms(18, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "7", "25:00:00", "12:60:00", "12:00:60", "noon", "12:00:00:00", "-1:00:00"] {
            assert_eq!(
                ClockTime::parse(bad),
                Err(ScheduleError::InvalidTime(bad.to_string())),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_display_round_trips_through_string() {
        let time = ClockTime::parse("01:02:03").unwrap();
        assert_eq!(time.to_string(), "01:02:03");
        let json = serde_json::to_string(&time).unwrap();
        assert_eq!(json, "\"01:02:03\"");
        assert!(serde_json::from_str::<ClockTime>("\"99:00:00\"").is_err());
    }

    #[test]
    fn test_overnight_window_spans_eighteen_hours() {
        let window = ScheduleWindow::parse("07:00:00", "01:00:00").unwrap();
        assert!(window.crosses_midnight());
        assert_eq!(window.duration(), Duration::hours(18));

        let today = window.on(date());
        assert_eq!(today.start, date().and_hms_opt(7, 0, 0).unwrap());
        assert_eq!(today.end, date().succ_opt().unwrap().and_hms_opt(1, 0, 0).unwrap());
        assert_eq!(today.duration(), Duration::hours(18));
    }

    #[test]
    fn test_same_day_window() {
        let window = ScheduleWindow::parse("09:00:00", "17:30:00").unwrap();
        assert!(!window.crosses_midnight());
        assert_eq!(window.duration(), Duration::minutes(8 * 60 + 30));
        assert_eq!(window.on(date()).end.date(), date());
    }

    #[test]
    fn test_equal_bounds_is_full_day() {
        let window = ScheduleWindow::parse("12:00:00", "12:00:00").unwrap();
        assert!(window.crosses_midnight());
        assert_eq!(window.duration(), Duration::hours(24));
        assert_eq!(window.on(date()).duration(), Duration::hours(24));
    }

    #[test]
    fn test_crossing_duration_matches_formula() {
        let midnight = Duration::hours(24);
        // Sample a grid of start/end pairs rather than every second of the day
        for start_secs in (0..86_400u32).step_by(3_607) {
            for end_secs in (0..=start_secs).step_by(2_903) {
                let start = ClockTime::from_hms(start_secs / 3600, start_secs / 60 % 60, start_secs % 60).unwrap();
                let end = ClockTime::from_hms(end_secs / 3600, end_secs / 60 % 60, end_secs % 60).unwrap();
                let window = ScheduleWindow::new(start, end);

                let expected = (midnight - Duration::seconds(start_secs as i64)) + Duration::seconds(end_secs as i64);
                assert_eq!(window.duration(), expected, "{}", window);
                assert_eq!(window.on(date()).duration(), expected, "{}", window);
            }
        }
    }

    #[test]
    fn test_advance_day_keeps_duration() {
        let mut daily = ScheduleWindow::parse("07:00:00", "01:00:00").unwrap().on(date());
        let before = daily;
        daily.advance_day();

        assert_eq!(daily.start - before.start, Duration::days(1));
        assert_eq!(daily.end - before.end, Duration::days(1));
        assert_eq!(daily.duration(), before.duration());
    }

    #[test]
    fn test_format_span() {
        assert_eq!(format_span(Duration::hours(18)), "18h00m");
        assert_eq!(format_span(Duration::minutes(90)), "1h30m");
        assert_eq!(format_span(Duration::hours(24)), "24h00m");
    }

    #[test]
    fn test_contains_is_half_open() {
        let daily = ScheduleWindow::parse("22:00:00", "02:00:00").unwrap().on(date());
        assert!(daily.contains(daily.start));
        assert!(daily.contains(date().succ_opt().unwrap().and_hms_opt(1, 59, 59).unwrap()));
        assert!(!daily.contains(daily.end));
        assert!(!daily.contains(date().and_hms_opt(21, 59, 59).unwrap()));
    }
}
