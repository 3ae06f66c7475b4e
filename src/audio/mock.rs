use crate::audio::sink::{AudioSink, SinkError, SinkResult, SinkStatus};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default length of the pretend clip
pub const DEFAULT_CLIP_LENGTH: Duration = Duration::from_secs(3);

/// A call made on a [`MockAudioSink`], in order
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Load(String),
    SetRate(f64),
    Play,
    Stop,
}

/// Shared view into a mock sink, usable after the sink has been moved away
#[derive(Clone, Default)]
pub struct SinkRecorder {
    calls: Arc<Mutex<Vec<SinkCall>>>,
    failing_loads: Arc<AtomicUsize>,
}

#[cfg(test)]
impl SinkRecorder {
    /// All calls so far
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of `play` calls so far
    pub fn play_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == SinkCall::Play).count()
    }

    /// Make the next `count` loads fail
    pub fn fail_next_loads(&self, count: usize) {
        self.failing_loads.store(count, Ordering::SeqCst);
    }
}

impl SinkRecorder {
    fn record(&self, call: SinkCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn take_load_failure(&self) -> bool {
        self.failing_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Audio sink that plays nothing
///
/// Each play "lasts" the configured clip length divided by the current rate,
/// measured on the tokio clock. Used by tests and as the simulated output.
/// With [`check_files`] set, loading a path that does not exist fails the
/// way a real output would.
///
/// [`check_files`]: MockAudioSink::check_files
pub struct MockAudioSink {
    name: String,
    status: SinkStatus,
    clip: Option<String>,
    clip_length: Duration,
    check_files: bool,
    rate: f64,
    ends_at: Option<Instant>,
    recorder: SinkRecorder,
}

impl MockAudioSink {
    /// Create a new mock sink
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: SinkStatus::Empty,
            clip: None,
            clip_length: DEFAULT_CLIP_LENGTH,
            check_files: false,
            rate: 1.0,
            ends_at: None,
            recorder: SinkRecorder::default(),
        }
    }

    /// Set how long one play of the clip lasts at rate 1.0
    pub fn with_clip_length(mut self, clip_length: Duration) -> Self {
        self.clip_length = clip_length;
        self
    }

    /// Require loaded clips to exist on disk
    pub fn check_files(mut self, check: bool) -> Self {
        self.check_files = check;
        self
    }

    /// Handle for inspecting calls (for verification)
    #[cfg(test)]
    pub fn recorder(&self) -> SinkRecorder {
        self.recorder.clone()
    }

    /// When the current play ends; very slow rates can overflow the clock
    fn play_end(&self) -> SinkResult<Instant> {
        Duration::try_from_secs_f64(self.clip_length.as_secs_f64() / self.rate)
            .ok()
            .and_then(|length| Instant::now().checked_add(length))
            .ok_or_else(|| SinkError::Playback(format!("clip too long at {:.2e}x", self.rate)))
    }

    async fn missing_reason(&self, uri: &str) -> Option<String> {
        if uri.trim().is_empty() {
            return Some("empty path".to_string());
        }
        if self.recorder.take_load_failure() {
            return Some("clip unavailable".to_string());
        }
        if self.check_files {
            if let Err(e) = tokio::fs::metadata(uri).await {
                return Some(e.to_string());
            }
        }
        None
    }
}

#[async_trait]
impl AudioSink for MockAudioSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> SinkStatus {
        self.status
    }

    fn loaded_clip(&self) -> Option<&str> {
        self.clip.as_deref()
    }

    async fn load(&mut self, uri: &str) -> SinkResult<()> {
        self.recorder.record(SinkCall::Load(uri.to_string()));
        self.ends_at = None;

        if let Some(reason) = self.missing_reason(uri).await {
            self.status = SinkStatus::Error;
            self.clip = None;
            return Err(SinkError::Load {
                uri: uri.to_string(),
                reason,
            });
        }

        debug!("{}: loaded {}", self.name, uri);
        self.clip = Some(uri.to_string());
        self.status = SinkStatus::Ready;
        Ok(())
    }

    async fn set_rate(&mut self, rate: f64) -> SinkResult<()> {
        self.recorder.record(SinkCall::SetRate(rate));
        if !(rate.is_finite() && rate > 0.0) {
            return Err(SinkError::Playback(format!("unsupported rate {}", rate)));
        }
        self.rate = rate;
        Ok(())
    }

    async fn play(&mut self) -> SinkResult<()> {
        self.recorder.record(SinkCall::Play);
        let Some(clip) = &self.clip else {
            self.status = SinkStatus::Error;
            return Err(SinkError::NotLoaded);
        };

        let ends_at = match self.play_end() {
            Ok(ends_at) => ends_at,
            Err(e) => {
                self.status = SinkStatus::Error;
                return Err(e);
            }
        };

        info!("{}: playing {} at {:.2}x", self.name, clip, self.rate);
        self.ends_at = Some(ends_at);
        self.status = SinkStatus::Playing;
        Ok(())
    }

    async fn wait_finished(&mut self) {
        if let Some(ends_at) = self.ends_at {
            tokio::time::sleep_until(ends_at).await;
            self.ends_at = None;
            self.status = SinkStatus::Ready;
        }
    }

    async fn stop(&mut self) -> SinkResult<()> {
        self.recorder.record(SinkCall::Stop);
        self.ends_at = None;
        if self.clip.is_some() {
            self.status = SinkStatus::Ready;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_sink_load_and_play() {
        let mut sink = MockAudioSink::new("test");
        assert_eq!(sink.status(), SinkStatus::Empty);
        assert_eq!(sink.play().await, Err(SinkError::NotLoaded));

        sink.load("bell.wav").await.unwrap();
        assert_eq!(sink.status(), SinkStatus::Ready);
        assert_eq!(sink.loaded_clip(), Some("bell.wav"));

        sink.play().await.unwrap();
        assert_eq!(sink.status(), SinkStatus::Playing);

        sink.stop().await.unwrap();
        assert_eq!(sink.status(), SinkStatus::Ready);

        let recorder = sink.recorder();
        assert_eq!(
            recorder.calls(),
            vec![
                SinkCall::Play,
                SinkCall::Load("bell.wav".to_string()),
                SinkCall::Play,
                SinkCall::Stop,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_sink_play_length_scales_with_rate() {
        let mut sink = MockAudioSink::new("test").with_clip_length(Duration::from_secs(4));
        sink.load("bell.wav").await.unwrap();
        sink.set_rate(2.0).await.unwrap();

        let started = Instant::now();
        sink.play().await.unwrap();
        sink.wait_finished().await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2_100), "{:?}", elapsed);
        assert_eq!(sink.status(), SinkStatus::Ready);
    }

    #[tokio::test]
    async fn test_mock_sink_injected_load_failure() {
        let mut sink = MockAudioSink::new("test");
        sink.recorder().fail_next_loads(1);

        assert!(matches!(sink.load("bell.wav").await, Err(SinkError::Load { .. })));
        assert_eq!(sink.status(), SinkStatus::Error);

        sink.load("bell.wav").await.unwrap();
        assert_eq!(sink.status(), SinkStatus::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_sink_tiny_rate_fails_play() {
        let mut sink = MockAudioSink::new("test");
        sink.load("bell.wav").await.unwrap();
        sink.set_rate(1e-20).await.unwrap();

        assert!(matches!(sink.play().await, Err(SinkError::Playback(_))));
        assert_eq!(sink.status(), SinkStatus::Error);

        sink.set_rate(1.0).await.unwrap();
        sink.play().await.unwrap();
        assert_eq!(sink.status(), SinkStatus::Playing);
    }

    #[tokio::test]
    async fn test_mock_sink_checks_files_when_asked() {
        let path = std::env::temp_dir().join(format!("windowplay-clip-{}.wav", std::process::id()));
        std::fs::write(&path, b"RIFF").unwrap();
        let existing = path.to_string_lossy().to_string();

        let mut sink = MockAudioSink::new("test").check_files(true);
        let result = sink.load("/nonexistent/typo.mp3").await;
        assert!(matches!(result, Err(SinkError::Load { ref uri, .. }) if uri == "/nonexistent/typo.mp3"));
        assert_eq!(sink.loaded_clip(), None);

        sink.load(&existing).await.unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(sink.loaded_clip(), Some(existing.as_str()));

        // Without the check any non-blank path loads
        let mut sink = MockAudioSink::new("test");
        sink.load("/nonexistent/typo.mp3").await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_finished_when_idle_returns() {
        let mut sink = MockAudioSink::new("test");
        sink.wait_finished().await;
        assert_eq!(sink.status(), SinkStatus::Empty);
    }
}
