use crate::audio::SinkKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Defaults read from a JSON file at startup
///
/// Every field is optional; command-line flags override what is set here.
/// The file is only read, never written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub start: Option<String>,
    pub end: Option<String>,
    pub rate: Option<f64>,
    pub file: Option<String>,
    pub sink: Option<SinkKind>,
    pub clip_seconds: Option<f64>,
    pub min_repeats: Option<u32>,
    pub max_repeats: Option<u32>,
    pub min_delay: Option<u64>,
    pub max_delay: Option<u64>,
    pub poll_ms: Option<u64>,
}

impl Settings {
    /// `<config dir>/windowplay/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("windowplay").join("settings.json"))
    }

    /// Load from an explicit path; the file must exist
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Load from the default location, or defaults if there is no file
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}
