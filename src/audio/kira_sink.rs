use crate::audio::sink::{AudioSink, SinkError, SinkResult, SinkStatus};
use async_trait::async_trait;
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::sound::PlaybackState;
use kira::{AudioManager, AudioManagerSettings, DefaultBackend, Tween};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

/// How often the audio thread checks whether the current play has ended
const STATE_POLL: Duration = Duration::from_millis(20);

enum Command {
    Load(String, oneshot::Sender<SinkResult<()>>),
    SetRate(f64),
    Play(oneshot::Sender<SinkResult<()>>),
    Stop,
    Shutdown,
}

/// Audio output through kira
///
/// The kira manager lives on its own thread; this handle talks to it over a
/// channel so it can be moved into the scheduler task.
pub struct KiraSink {
    name: String,
    status: SinkStatus,
    clip: Option<String>,
    commands: std_mpsc::Sender<Command>,
    playing: watch::Receiver<bool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl KiraSink {
    /// Open the default output device
    pub fn open() -> SinkResult<Self> {
        let (commands, command_rx) = std_mpsc::channel();
        let (playing_tx, playing) = watch::channel(false);
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let worker = thread::Builder::new()
            .name("kira-output".to_string())
            .spawn(move || run_output(command_rx, playing_tx, ready_tx))
            .map_err(|e| SinkError::Backend(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(SinkError::Backend("audio thread exited".to_string())),
        }

        info!("Opened kira audio output");
        Ok(Self {
            name: "kira".to_string(),
            status: SinkStatus::Empty,
            clip: None,
            commands,
            playing,
            worker: Some(worker),
        })
    }

    fn send(&self, command: Command) -> SinkResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SinkError::Backend("audio thread exited".to_string()))
    }

    async fn request(
        &self,
        make: impl FnOnce(oneshot::Sender<SinkResult<()>>) -> Command,
    ) -> SinkResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx))?;
        reply_rx
            .await
            .map_err(|_| SinkError::Backend("audio thread dropped the request".to_string()))?
    }
}

impl Drop for KiraSink {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[async_trait]
impl AudioSink for KiraSink {
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
        let path = uri.to_string();
        match self.request(|reply| Command::Load(path, reply)).await {
            Ok(()) => {
                self.clip = Some(uri.to_string());
                self.status = SinkStatus::Ready;
                Ok(())
            }
            Err(e) => {
                self.clip = None;
                self.status = SinkStatus::Error;
                Err(e)
            }
        }
    }

    async fn set_rate(&mut self, rate: f64) -> SinkResult<()> {
        self.send(Command::SetRate(rate))
    }

    async fn play(&mut self) -> SinkResult<()> {
        match self.request(Command::Play).await {
            Ok(()) => {
                self.status = SinkStatus::Playing;
                Ok(())
            }
            Err(e) => {
                self.status = SinkStatus::Error;
                Err(e)
            }
        }
    }

    async fn wait_finished(&mut self) {
        if self.playing.wait_for(|playing| !*playing).await.is_err() {
            warn!("kira output thread is gone");
        }
        if self.status == SinkStatus::Playing {
            self.status = SinkStatus::Ready;
        }
    }

    async fn stop(&mut self) -> SinkResult<()> {
        self.send(Command::Stop)?;
        // The worker clears the flag on its next poll; wait so a following
        // `wait_finished` does not see the stale value.
        let _ = self.playing.wait_for(|playing| !*playing).await;
        if self.clip.is_some() {
            self.status = SinkStatus::Ready;
        }
        Ok(())
    }
}

/// Body of the audio thread: owns the kira manager and the active handle
fn run_output(
    commands: std_mpsc::Receiver<Command>,
    playing: watch::Sender<bool>,
    ready: std_mpsc::Sender<SinkResult<()>>,
) {
    let mut manager = match AudioManager::<DefaultBackend>::new(AudioManagerSettings::default()) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Failed to open audio output: {}", e);
            let _ = ready.send(Err(SinkError::Backend(e.to_string())));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut data: Option<StaticSoundData> = None;
    let mut handle: Option<StaticSoundHandle> = None;
    let mut rate = 1.0;

    loop {
        match commands.recv_timeout(STATE_POLL) {
            Ok(Command::Load(path, reply)) => {
                if let Some(h) = handle.as_mut() {
                    h.stop(Tween::default());
                }
                handle = None;
                let result = match StaticSoundData::from_file(&path) {
                    Ok(decoded) => {
                        debug!("Decoded {}", path);
                        data = Some(decoded);
                        Ok(())
                    }
                    Err(e) => {
                        data = None;
                        Err(SinkError::Load { uri: path, reason: e.to_string() })
                    }
                };
                let _ = reply.send(result);
            }
            Ok(Command::SetRate(new_rate)) => {
                rate = new_rate;
                if let Some(h) = handle.as_mut() {
                    h.set_playback_rate(rate, Tween::default());
                }
            }
            Ok(Command::Play(reply)) => {
                let result = match &data {
                    None => Err(SinkError::NotLoaded),
                    Some(d) => {
                        if let Some(h) = handle.as_mut() {
                            h.stop(Tween::default());
                        }
                        match manager.play(d.clone()) {
                            Ok(mut h) => {
                                h.set_playback_rate(rate, Tween::default());
                                handle = Some(h);
                                playing.send_replace(true);
                                Ok(())
                            }
                            Err(e) => Err(SinkError::Playback(e.to_string())),
                        }
                    }
                };
                let _ = reply.send(result);
            }
            Ok(Command::Stop) => {
                if let Some(h) = handle.as_mut() {
                    h.stop(Tween::default());
                }
                handle = None;
                playing.send_replace(false);
            }
            Ok(Command::Shutdown) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
        }

        let finished = handle
            .as_ref()
            .map(|h| h.state() == PlaybackState::Stopped)
            .unwrap_or(true);
        if finished {
            handle = None;
            if *playing.borrow() {
                playing.send_replace(false);
            }
        }
    }

    debug!("kira output thread exiting");
}
