use crate::audio::SinkKind;
use crate::core::{BurstPolicy, PlaybackConfig, PlaybackRate, ScheduleError, ScheduleWindow};
use crate::input::Settings;
use crate::scheduler::SchedulerTiming;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "windowplay", version, about = "Play an audio clip in random bursts during a daily time window")]
pub struct CliArgs {
    /// Window start, HH:MM:SS [default: 07:00:00]
    #[arg(short, long)]
    pub start: Option<String>,

    /// Window end, HH:MM:SS; at or before the start means the next day [default: 01:00:00]
    #[arg(short, long)]
    pub end: Option<String>,

    /// Playback rate, 1.0 is normal speed [default: 1.0]
    #[arg(short, long)]
    pub rate: Option<f64>,

    /// Clip to play [default: footsteps.mp3]
    #[arg(short, long)]
    pub file: Option<String>,

    /// Audio output [default: simulated]
    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,

    /// Length of one play with the simulated output, in seconds [default: 3]
    #[arg(long)]
    pub clip_seconds: Option<f64>,

    /// Settings file [default: <config dir>/windowplay/settings.json]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start the loop immediately
    #[arg(short, long)]
    pub autostart: bool,

    /// Seed for repeat counts and delays
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fewest plays per burst [default: 1]
    #[arg(long)]
    pub min_repeats: Option<u32>,

    /// Most plays per burst [default: 5]
    #[arg(long)]
    pub max_repeats: Option<u32>,

    /// Shortest pause between bursts, in seconds [default: 1]
    #[arg(long)]
    pub min_delay: Option<u64>,

    /// Longest pause between bursts, in seconds [default: 60]
    #[arg(long)]
    pub max_delay: Option<u64>,

    /// Window boundary check interval in milliseconds [default: 1000]
    #[arg(long)]
    pub poll_ms: Option<u64>,
}

/// Everything needed to build the scheduler, after merging flags and settings
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub window: ScheduleWindow,
    pub playback: PlaybackConfig,
    pub policy: BurstPolicy,
    pub timing: SchedulerTiming,
    pub sink: SinkKind,
    pub clip_length: Duration,
    pub autostart: bool,
    pub seed: Option<u64>,
}

impl CliArgs {
    /// Merge with file settings; flags win
    pub fn resolve(self, settings: Settings) -> Result<RunConfig, ScheduleError> {
        let defaults = ScheduleWindow::default();
        let start = match self.start.or(settings.start) {
            Some(text) => text.parse()?,
            None => defaults.start,
        };
        let end = match self.end.or(settings.end) {
            Some(text) => text.parse()?,
            None => defaults.end,
        };

        let rate = match self.rate.or(settings.rate) {
            Some(value) => PlaybackRate::new(value)?,
            None => PlaybackRate::NORMAL,
        };
        let playback = match self.file.or(settings.file) {
            Some(clip) => PlaybackConfig::new(clip, rate)?,
            None => PlaybackConfig { rate, ..PlaybackConfig::default() },
        };

        let repeats = self.min_repeats.or(settings.min_repeats).unwrap_or(*BurstPolicy::DEFAULT_REPEATS.start())
            ..=self.max_repeats.or(settings.max_repeats).unwrap_or(*BurstPolicy::DEFAULT_REPEATS.end());
        let delay = self.min_delay.or(settings.min_delay).unwrap_or(*BurstPolicy::DEFAULT_DELAY_SECS.start())
            ..=self.max_delay.or(settings.max_delay).unwrap_or(*BurstPolicy::DEFAULT_DELAY_SECS.end());
        let policy = BurstPolicy::new(repeats, delay)?;

        let timing = match self.poll_ms.or(settings.poll_ms) {
            Some(0) => return Err(ScheduleError::InvalidDuration { what: "poll interval", value: 0.0 }),
            Some(ms) => SchedulerTiming { poll_interval: Duration::from_millis(ms) },
            None => SchedulerTiming::default(),
        };

        let clip_seconds = self.clip_seconds.or(settings.clip_seconds).unwrap_or(3.0);
        let clip_length = Duration::try_from_secs_f64(clip_seconds)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(ScheduleError::InvalidDuration { what: "clip length", value: clip_seconds })?;

        Ok(RunConfig {
            window: ScheduleWindow::new(start, end),
            playback,
            policy,
            timing,
            sink: self.sink.or(settings.sink).unwrap_or_default(),
            clip_length,
            autostart: self.autostart,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("windowplay").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let run = parse(&[]).resolve(Settings::default()).unwrap();
        assert_eq!(run.window, ScheduleWindow::parse("07:00:00", "01:00:00").unwrap());
        assert_eq!(run.playback, PlaybackConfig::default());
        assert_eq!(run.policy, BurstPolicy::default());
        assert_eq!(run.timing.poll_interval, Duration::from_secs(1));
        assert_eq!(run.sink, SinkKind::Simulated);
        assert_eq!(run.clip_length, Duration::from_secs(3));
        assert!(!run.autostart);
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            start: Some("06:00:00".to_string()),
            rate: Some(0.75),
            max_delay: Some(10),
            ..Settings::default()
        };
        let run = parse(&["--start", "08:15", "--file", "bell.ogg", "-a", "--seed", "9"])
            .resolve(settings)
            .unwrap();

        assert_eq!(run.window.start.to_string(), "08:15:00");
        assert_eq!(run.playback.rate.get(), 0.75);
        assert_eq!(run.playback.clip, "bell.ogg");
        assert_eq!(run.policy.delay_secs(), &(1..=10));
        assert!(run.autostart);
        assert_eq!(run.seed, Some(9));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse(&["--end", "25:00:00"]).resolve(Settings::default()).is_err());
        assert_eq!(
            parse(&["--rate", "0"]).resolve(Settings::default()),
            Err(ScheduleError::InvalidRate(0.0))
        );
        assert!(parse(&["--min-repeats", "6"]).resolve(Settings::default()).is_err());
        assert!(parse(&["--poll-ms", "0"]).resolve(Settings::default()).is_err());
        assert!(parse(&["--clip-seconds", "0"]).resolve(Settings::default()).is_err());
    }

    #[test]
    fn test_sink_flag() {
        let run = parse(&["--sink", "kira"]).resolve(Settings::default()).unwrap();
        assert_eq!(run.sink, SinkKind::Kira);
    }
}
