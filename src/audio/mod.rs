pub mod mock;
pub mod sink;
#[cfg(feature = "kira")]
pub mod kira_sink;

pub use mock::MockAudioSink;
pub use sink::{AudioSink, SinkError, SinkResult};
#[cfg(feature = "kira")]
pub use kira_sink::KiraSink;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which output the scheduler drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Log plays and wait for the configured clip length
    #[default]
    Simulated,
    /// Play through the default output device (feature `kira`)
    Kira,
}

/// Open the requested output
pub fn open_sink(kind: SinkKind, clip_length: Duration) -> SinkResult<Box<dyn AudioSink>> {
    match kind {
        SinkKind::Simulated => Ok(Box::new(
            MockAudioSink::new("simulated")
                .with_clip_length(clip_length)
                .check_files(true),
        )),
        #[cfg(feature = "kira")]
        SinkKind::Kira => Ok(Box::new(KiraSink::open()?)),
        #[cfg(not(feature = "kira"))]
        SinkKind::Kira => Err(SinkError::Backend(
            "built without the `kira` feature".to_string(),
        )),
    }
}
