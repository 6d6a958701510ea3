//! Settings persistence
//!
//! Stores encode settings and default folders in ~/.config/xspf2mp4/config.json.
//! A missing file means defaults; partial files fill gaps with defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How every segment is normalized before concatenation
///
/// All segments of a playlist must share these values, otherwise the
/// stream-copy concat produces a broken file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// x264 constant rate factor, lower = better quality / bigger file
    pub crf: u32,
    /// x264 preset
    pub preset: String,
    pub audio_bitrate: String,
    pub audio_sample_rate: u32,
    pub audio_channels: u32,
    /// Background for audio-only items
    pub pad_color: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            crf: 19,
            preset: "veryfast".to_string(),
            audio_bitrate: "192k".to_string(),
            audio_sample_rate: 48_000,
            audio_channels: 2,
            pad_color: "black".to_string(),
        }
    }
}

/// Persistent application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Config format version
    pub version: u32,
    pub encode: EncodeSettings,
    /// Explicit ffmpeg binary, otherwise searched next to the executable and on PATH
    pub ffmpeg: Option<PathBuf>,
    /// Folder scanned by `batch` and `pick`
    pub input_dir: PathBuf,
    /// Where MP4s, reports and work folders go
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            encode: EncodeSettings::default(),
            ffmpeg: None,
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Settings {
    /// Load settings from the default config path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let settings: Self =
            serde_json::from_str(&contents).with_context(|| "Failed to parse config")?;

        debug!("Loaded config from {}", path.display());
        Ok(settings)
    }

    /// Save settings to the default config path
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("xspf2mp4").join("config.json"))
    }
}
