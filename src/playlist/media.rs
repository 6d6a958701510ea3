//! Media classification by file extension

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "ogg", "flac", "opus", "wma"];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "mkv", "avi", "m4v", "webm", "wmv", "mpg", "mpeg", "ts", "flv",
];

/// What kind of segment a playlist item turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio only, gets a synthesized black video track
    Audio,
    /// Has a video stream, gets re-encoded and normalized
    Video,
    /// Extension we don't know how to handle
    Unknown,
}

impl MediaKind {
    /// Classify a path by its (case-insensitive) extension
    pub fn classify(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Self::Unknown;
        };
        let ext = ext.to_ascii_lowercase();

        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Audio
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video
        } else {
            Self::Unknown
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Audio => "AUDIO",
            Self::Video => "VIDEO",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}
