use crate::audio::{AudioSink, SinkError};
use crate::core::{format_span, BurstPolicy, DailyWindow, PlaybackRate, ScheduleWindow};
use crate::scheduler::{Clock, SchedulerState, SchedulerStatus, SchedulerTiming};
use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Marker returned once `stop()` has been observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// One run of the daily playback loop
///
/// Owns the sink for as long as it runs and hands it back from [`run`].
///
/// [`run`]: ScheduleLoop::run
pub struct ScheduleLoop {
    window: ScheduleWindow,
    clip: String,
    rate: watch::Receiver<PlaybackRate>,
    policy: BurstPolicy,
    timing: SchedulerTiming,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    sink: Box<dyn AudioSink>,
    status: watch::Sender<SchedulerStatus>,
    cancel: watch::Receiver<bool>,
}

impl ScheduleLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        window: ScheduleWindow,
        clip: String,
        rate: watch::Receiver<PlaybackRate>,
        policy: BurstPolicy,
        timing: SchedulerTiming,
        clock: Arc<dyn Clock>,
        rng: StdRng,
        sink: Box<dyn AudioSink>,
        status: watch::Sender<SchedulerStatus>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self {
            window,
            clip,
            rate,
            policy,
            timing,
            clock,
            rng,
            sink,
            status,
            cancel,
        }
    }

    /// Run until cancelled, then silence the sink and return it
    pub async fn run(mut self) -> Box<dyn AudioSink> {
        let cancelled = match self.cycle().await {
            Ok(never) => match never {},
            Err(cancelled) => cancelled,
        };

        debug!("Playback loop ended: {:?}", cancelled);
        self.silence().await;
        self.publish(SchedulerState::Idle, false, "Stopped");
        self.sink
    }

    async fn cycle(&mut self) -> Result<std::convert::Infallible, Cancelled> {
        let mut daily = self.window.on(self.clock.now().date());

        loop {
            info!("Starting playback at {}", daily.start);
            self.publish(
                SchedulerState::WaitingForWindowStart,
                false,
                format!(
                    "Waiting for window {} to {} ({})",
                    daily.start,
                    daily.end,
                    format_span(daily.duration())
                ),
            );
            self.wait_until(daily.start).await?;

            while daily.contains(self.clock.now()) {
                let failure = self.play_burst().await?;

                let delay = self.policy.draw_delay(&mut self.rng);
                let message = match failure {
                    Some(e) => format!("playback error: {}; retrying in {}s", e, delay.as_secs()),
                    None => format!("Waiting {}s before replaying", delay.as_secs()),
                };
                info!("{}", message);
                self.publish(SchedulerState::PausedBetweenBursts, false, message);
                self.sleep(delay).await?;
            }

            self.roll_over(&mut daily).await;
        }
    }

    /// Play one burst; a sink failure ends the burst early and is returned
    async fn play_burst(&mut self) -> Result<Option<SinkError>, Cancelled> {
        let repeats = self.policy.draw_repeats(&mut self.rng);
        let rate = *self.rate.borrow_and_update();
        info!("Playing audio {} times at {}", repeats, rate);

        if let Err(e) = self.prepare(rate).await {
            warn!("Could not prepare {}: {}", self.clip, e);
            return Ok(Some(e));
        }

        for played in 0..repeats {
            self.check_cancelled()?;
            if let Err(e) = self.sink.play().await {
                warn!("Play {} of {} failed: {}", played + 1, repeats, e);
                return Ok(Some(e));
            }
            self.publish(
                SchedulerState::PlayingBurst,
                true,
                format!("Playing {} ({}/{}) at {}", self.clip, played + 1, repeats, rate),
            );
            self.wait_clip_end().await?;
        }

        Ok(None)
    }

    async fn prepare(&mut self, rate: PlaybackRate) -> Result<(), SinkError> {
        if self.sink.loaded_clip() != Some(self.clip.as_str()) {
            self.sink.load(&self.clip).await?;
        }
        self.sink.set_rate(rate.get()).await
    }

    async fn roll_over(&mut self, daily: &mut DailyWindow) {
        self.publish(
            SchedulerState::WaitingForWindowEnd,
            false,
            format!("Window ended at {}", daily.end),
        );
        self.silence().await;
        daily.advance_day();

        // The wall clock can leap days ahead across a suspend
        let now = self.clock.now();
        if daily.end <= now {
            warn!("Clock jumped past {}; resyncing to {}", daily.end, now.date());
            *daily = self.window.on(now.date());
            if daily.end <= now {
                daily.advance_day();
            }
        }
        info!("Stopping playback. Next start at {}", daily.start);
    }

    async fn silence(&mut self) {
        if let Err(e) = self.sink.stop().await {
            warn!("Failed to stop {}: {}", self.sink.name(), e);
        }
    }

    /// Poll until the clock reaches `target`
    async fn wait_until(&mut self, target: NaiveDateTime) -> Result<(), Cancelled> {
        loop {
            self.check_cancelled()?;
            if self.clock.now() >= target {
                return Ok(());
            }
            self.sleep(self.timing.poll_interval).await?;
        }
    }

    async fn sleep(&mut self, duration: Duration) -> Result<(), Cancelled> {
        tokio::select! {
            biased;
            _ = cancelled(&mut self.cancel) => Err(Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    async fn wait_clip_end(&mut self) -> Result<(), Cancelled> {
        tokio::select! {
            biased;
            _ = cancelled(&mut self.cancel) => Err(Cancelled),
            _ = self.sink.wait_finished() => Ok(()),
        }
    }

    fn check_cancelled(&self) -> Result<(), Cancelled> {
        if *self.cancel.borrow() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    fn publish(&self, state: SchedulerState, playing: bool, message: impl Into<String>) {
        let status = SchedulerStatus {
            state,
            playing,
            message: message.into(),
        };
        debug!("{}", status);
        self.status.send_replace(status);
    }
}

/// Resolve once the flag is set or its sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}
