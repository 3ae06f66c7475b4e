use async_trait::async_trait;
use thiserror::Error;

/// Result type for audio sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Failures reported by an audio sink
///
/// None of these are fatal to the scheduler: every play attempt is best-effort.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SinkError {
    /// `play` was called before a clip was loaded
    #[error("no clip loaded")]
    NotLoaded,

    /// The clip could not be opened or decoded
    #[error("failed to load '{uri}': {reason}")]
    Load { uri: String, reason: String },

    /// The output refused to start playback
    #[error("playback failed: {0}")]
    Playback(String),

    /// The output device or its worker is gone
    #[error("audio backend unavailable: {0}")]
    Backend(String),
}

/// Status of an audio sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    /// No clip loaded
    Empty,
    /// Clip loaded, not playing
    Ready,
    /// Clip is playing
    Playing,
    /// Last operation failed
    Error,
}

/// Trait for audio output implementations
///
/// The scheduler is the only caller. Implementations:
/// - `MockAudioSink` for tests and the simulated runtime output
/// - `KiraSink` for real playback (feature `kira`)
#[async_trait]
pub trait AudioSink: Send {
    /// Get the name/identifier of this sink
    fn name(&self) -> &str;

    /// Get the current status of the sink
    fn status(&self) -> SinkStatus;

    /// The clip currently loaded, if any
    fn loaded_clip(&self) -> Option<&str>;

    /// Load a clip by path or URI, replacing any previous one
    async fn load(&mut self, uri: &str) -> SinkResult<()>;

    /// Set the rate used by the current and following plays
    async fn set_rate(&mut self, rate: f64) -> SinkResult<()>;

    /// Start playing the loaded clip from the beginning
    async fn play(&mut self) -> SinkResult<()>;

    /// Resolve once the current play reaches its natural end
    ///
    /// Returns immediately when nothing is playing. Must be cancel-safe:
    /// dropping the future leaves playback untouched.
    async fn wait_finished(&mut self);

    /// Pause and rewind to the start of the clip
    async fn stop(&mut self) -> SinkResult<()>;
}
