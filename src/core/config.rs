use crate::core::error::ScheduleError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Clip playback rate (1.0 = normal speed, 2.0 = double speed)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    pub const NORMAL: PlaybackRate = PlaybackRate(1.0);

    /// Accept only finite values above zero
    pub fn new(value: f64) -> Result<Self, ScheduleError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ScheduleError::InvalidRate(value))
        }
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}x", self.0)
    }
}

impl TryFrom<f64> for PlaybackRate {
    type Error = ScheduleError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlaybackRate> for f64 {
    fn from(value: PlaybackRate) -> Self {
        value.0
    }
}

/// What to play and how fast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub rate: PlaybackRate,
    /// Path or URI of the clip handed to the sink
    pub clip: String,
}

impl PlaybackConfig {
    pub fn new(clip: impl Into<String>, rate: PlaybackRate) -> Result<Self, ScheduleError> {
        let clip = clip.into();
        if clip.trim().is_empty() {
            return Err(ScheduleError::EmptyClip);
        }
        Ok(Self { rate, clip })
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            rate: PlaybackRate::NORMAL,
            clip: "footsteps.mp3".to_string(),
        }
    }
}

/// Ranges the repeat count and inter-burst delay are drawn from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurstPolicy {
    repeats: RangeInclusive<u32>,
    delay_secs: RangeInclusive<u64>,
}

impl BurstPolicy {
    pub const DEFAULT_REPEATS: RangeInclusive<u32> = 1..=5;
    pub const DEFAULT_DELAY_SECS: RangeInclusive<u64> = 1..=60;

    pub fn new(repeats: RangeInclusive<u32>, delay_secs: RangeInclusive<u64>) -> Result<Self, ScheduleError> {
        if *repeats.start() == 0 || repeats.is_empty() {
            return Err(ScheduleError::InvalidRange {
                what: "repeat",
                min: *repeats.start() as u64,
                max: *repeats.end() as u64,
            });
        }
        if *delay_secs.start() == 0 || delay_secs.is_empty() {
            return Err(ScheduleError::InvalidRange {
                what: "delay",
                min: *delay_secs.start(),
                max: *delay_secs.end(),
            });
        }
        Ok(Self { repeats, delay_secs })
    }

    pub fn repeats(&self) -> &RangeInclusive<u32> {
        &self.repeats
    }

    pub fn delay_secs(&self) -> &RangeInclusive<u64> {
        &self.delay_secs
    }

    /// Draw how many times the clip plays back-to-back
    pub fn draw_repeats<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.repeats.clone())
    }

    /// Draw the pause before the next burst
    pub fn draw_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.delay_secs.clone()))
    }
}

impl Default for BurstPolicy {
    fn default() -> Self {
        Self {
            repeats: Self::DEFAULT_REPEATS,
            delay_secs: Self::DEFAULT_DELAY_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rate_validation() {
        assert_eq!(PlaybackRate::new(2.0).unwrap().get(), 2.0);
        assert_eq!(PlaybackRate::new(0.0), Err(ScheduleError::InvalidRate(0.0)));
        assert_eq!(PlaybackRate::new(-1.5), Err(ScheduleError::InvalidRate(-1.5)));
        assert!(PlaybackRate::new(f64::NAN).is_err());
        assert!(PlaybackRate::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_rate_deserialize_validates() {
        assert!(serde_json::from_str::<PlaybackRate>("0").is_err());
        assert_eq!(serde_json::from_str::<PlaybackRate>("1.25").unwrap().get(), 1.25);
    }

    #[test]
    fn test_config_rejects_blank_clip() {
        assert_eq!(PlaybackConfig::new("  ", PlaybackRate::NORMAL), Err(ScheduleError::EmptyClip));
        assert_eq!(PlaybackConfig::new("bell.ogg", PlaybackRate::NORMAL).unwrap().clip, "bell.ogg");
    }

    #[test]
    fn test_policy_rejects_bad_ranges() {
        assert!(BurstPolicy::new(0..=5, 1..=60).is_err());
        assert!(BurstPolicy::new(1..=5, 0..=60).is_err());
        #[allow(clippy::reversed_empty_ranges)]
        let empty = 5..=1;
        assert!(BurstPolicy::new(empty, 1..=60).is_err());
        assert!(BurstPolicy::new(3..=3, 10..=10).is_ok());
    }

    #[test]
    fn test_default_draws_stay_in_range() {
        let policy = BurstPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen_repeats = [false; 6];

        for _ in 0..2_000 {
            let repeats = policy.draw_repeats(&mut rng);
            assert!((1..=5).contains(&repeats));
            seen_repeats[repeats as usize] = true;

            let delay = policy.draw_delay(&mut rng);
            assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(60));
        }

        // Every repeat count should show up in 2000 draws
        assert!(seen_repeats[1..].iter().all(|&s| s));
    }
}
