use crate::audio::AudioSink;
use crate::core::{format_span, BurstPolicy, ClockTime, PlaybackConfig, PlaybackRate, ScheduleError, ScheduleWindow};
use crate::scheduler::{Clock, ScheduleLoop, SchedulerStatus, SchedulerTiming, SystemClock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A spawned playback loop and the means to stop it
struct RunningLoop {
    cancel: watch::Sender<bool>,
    task: JoinHandle<Box<dyn AudioSink>>,
}

/// Schedules clip playback inside a daily window
///
/// Owns the window, clip, rate and on/off toggle. At most one playback loop
/// runs per scheduler; the loop owns the sink while it runs.
pub struct PlaybackScheduler {
    window: ScheduleWindow,
    clip: String,
    rate: watch::Sender<PlaybackRate>,
    policy: BurstPolicy,
    timing: SchedulerTiming,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    status: watch::Sender<SchedulerStatus>,
    sink: Option<Box<dyn AudioSink>>,
    running: Option<RunningLoop>,
}

impl PlaybackScheduler {
    /// Create an idle scheduler with the default window, clip and policy
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        let config = PlaybackConfig::default();
        let (rate, _) = watch::channel(config.rate);
        let (status, _) = watch::channel(SchedulerStatus::idle("Ready"));

        Self {
            window: ScheduleWindow::default(),
            clip: config.clip,
            rate,
            policy: BurstPolicy::default(),
            timing: SchedulerTiming::default(),
            clock: Arc::new(SystemClock),
            rng: StdRng::from_entropy(),
            status,
            sink: Some(sink),
            running: None,
        }
    }

    pub fn with_window(mut self, window: ScheduleWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_config(mut self, config: PlaybackConfig) -> Self {
        self.clip = config.clip;
        self.rate.send_replace(config.rate);
        self
    }

    pub fn with_policy(mut self, policy: BurstPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timing(mut self, timing: SchedulerTiming) -> Self {
        self.timing = timing;
        self
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Make repeat counts and delays reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn window(&self) -> ScheduleWindow {
        self.window
    }

    pub fn rate(&self) -> PlaybackRate {
        *self.rate.borrow()
    }

    pub fn clip(&self) -> &str {
        &self.clip
    }

    /// Current status snapshot
    pub fn status(&self) -> SchedulerStatus {
        self.status.borrow().clone()
    }

    /// Receive every status change
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start the daily loop; a no-op if it is already running
    pub fn start(&mut self) -> Result<(), ScheduleError> {
        if self.running.is_some() {
            return Ok(());
        }
        let sink = self.sink.take().ok_or(ScheduleError::SinkUnavailable)?;

        let (cancel, cancel_rx) = watch::channel(false);
        let schedule = ScheduleLoop::new(
            self.window,
            self.clip.clone(),
            self.rate.subscribe(),
            self.policy.clone(),
            self.timing,
            self.clock.clone(),
            StdRng::seed_from_u64(self.rng.gen()),
            sink,
            self.status.clone(),
            cancel_rx,
        );

        info!("Starting scheduler: window {}, clip {}, rate {}", self.window, self.clip, self.rate());
        self.running = Some(RunningLoop {
            cancel,
            task: tokio::spawn(schedule.run()),
        });
        Ok(())
    }

    /// Replace window and config, then start
    pub fn start_with(&mut self, window: ScheduleWindow, config: PlaybackConfig) -> Result<(), ScheduleError> {
        self.window = window;
        self.clip = config.clip;
        self.rate.send_replace(config.rate);
        self.start()
    }

    /// Stop the loop and silence the sink
    ///
    /// Returns once the loop has exited; no sink call happens afterwards.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        running.cancel.send_replace(true);
        match running.task.await {
            Ok(sink) => self.sink = Some(sink),
            Err(e) => {
                error!("Playback loop failed: {}", e);
                self.status.send_replace(SchedulerStatus::idle("Stopped: audio output lost"));
                return;
            }
        }
        info!("Scheduler stopped");
    }

    /// Start when idle, stop otherwise
    pub async fn toggle(&mut self) -> Result<(), ScheduleError> {
        if self.is_running() {
            self.stop().await;
            Ok(())
        } else {
            self.start()
        }
    }

    /// Parse and apply both window bounds
    pub async fn set_window(&mut self, start: &str, end: &str) -> Result<(), ScheduleError> {
        match ScheduleWindow::parse(start, end) {
            Ok(window) => self.apply_window(window).await,
            Err(e) => Err(self.reject(e, format!("keeping window {}", self.window))),
        }
    }

    pub async fn set_start_time(&mut self, text: &str) -> Result<(), ScheduleError> {
        match ClockTime::parse(text) {
            Ok(start) => self.apply_window(ScheduleWindow::new(start, self.window.end)).await,
            Err(e) => Err(self.reject(e, format!("keeping start {}", self.window.start))),
        }
    }

    pub async fn set_end_time(&mut self, text: &str) -> Result<(), ScheduleError> {
        match ClockTime::parse(text) {
            Ok(end) => self.apply_window(ScheduleWindow::new(self.window.start, end)).await,
            Err(e) => Err(self.reject(e, format!("keeping end {}", self.window.end))),
        }
    }

    /// Takes effect at the start of the next burst
    pub fn set_rate(&mut self, value: f64) -> Result<(), ScheduleError> {
        match PlaybackRate::new(value) {
            Ok(rate) => {
                self.rate.send_replace(rate);
                self.note(format!("Playback rate set to {}", rate));
                Ok(())
            }
            Err(e) => Err(self.reject(e, format!("keeping rate {}", self.rate()))),
        }
    }

    pub async fn set_clip(&mut self, path: &str) -> Result<(), ScheduleError> {
        if path.trim().is_empty() {
            return Err(self.reject(ScheduleError::EmptyClip, format!("keeping {}", self.clip)));
        }
        self.clip = path.trim().to_string();
        self.note(format!("Clip set to {}", self.clip));
        self.restart_if_running().await
    }

    async fn apply_window(&mut self, window: ScheduleWindow) -> Result<(), ScheduleError> {
        self.window = window;
        self.note(format!("Window set to {} ({} long)", window, format_span(window.duration())));
        self.restart_if_running().await
    }

    async fn restart_if_running(&mut self) -> Result<(), ScheduleError> {
        if self.is_running() {
            self.stop().await;
            self.start()?;
        }
        Ok(())
    }

    /// Replace the status message, keeping state and playing flag
    fn note(&self, message: String) {
        info!("{}", message);
        self.status.send_modify(|status| status.message = message);
    }

    fn reject(&self, e: ScheduleError, keeping: String) -> ScheduleError {
        warn!("Rejected input: {}", e);
        self.note(format!("Rejected: {}; {}", e, keeping));
        e
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        // The loop sees the flag, silences the sink and exits on its own
        if let Some(running) = self.running.take() {
            running.cancel.send_replace(true);
        }
    }
}
