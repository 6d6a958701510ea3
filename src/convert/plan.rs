//! Decide which playlist entries become segments and which are skipped

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::playlist::{LocationError, MediaKind, Playlist, Track};

/// Strict mode lists at most this many offending entries
const MAX_LISTED_PROBLEMS: usize = 50;

/// A playlist entry that will be encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub track: Track,
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl PlannedItem {
    /// Work file name, numbered by playlist position so gaps from skipped
    /// entries stay visible
    pub fn segment_name(&self) -> String {
        format!("part_{:03}.mp4", self.track.index)
    }
}

/// Why an entry is left out of the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Resolved path does not exist
    Missing,
    /// Extension is neither audio nor video
    Unsupported,
    /// Not a local file (http, rtsp, ...)
    Remote { scheme: String },
    NoLocation,
    InvalidLocation { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("file not found"),
            Self::Unsupported => f.write_str("unsupported file type"),
            Self::Remote { scheme } => write!(f, "remote location ({}) not supported", scheme),
            Self::NoLocation => f.write_str("no location"),
            Self::InvalidLocation { message } => f.write_str(message),
        }
    }
}

impl From<LocationError> for SkipReason {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::Empty => Self::NoLocation,
            LocationError::Remote(scheme) => Self::Remote { scheme },
            e @ LocationError::InvalidUri(_) => Self::InvalidLocation {
                message: e.to_string(),
            },
        }
    }
}

/// A playlist entry that was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTrack {
    pub track: Track,
    pub path: Option<PathBuf>,
    pub reason: SkipReason,
}

impl SkippedTrack {
    /// Resolved path if there is one, otherwise the raw location
    pub fn describe(&self) -> String {
        match &self.path {
            Some(p) => p.display().to_string(),
            None if !self.track.location.is_empty() => self.track.location.clone(),
            None => self
                .track
                .title
                .clone()
                .unwrap_or_else(|| "(no location)".to_string()),
        }
    }
}

/// Accepted and skipped entries of one playlist, both in declared order
#[derive(Debug, Clone, Default)]
pub struct TrackPlan {
    pub items: Vec<PlannedItem>,
    pub skipped: Vec<SkippedTrack>,
}

impl TrackPlan {
    /// Resolve, check and classify every track of a playlist
    pub fn build(playlist: &Playlist, base_dir: &Path) -> Self {
        let mut plan = Self::default();

        for track in &playlist.tracks {
            let path = match track.resolve(base_dir) {
                Ok(path) => path,
                Err(e) => {
                    plan.skip(track, None, e.into());
                    continue;
                }
            };

            if !path.exists() {
                plan.skip(track, Some(path), SkipReason::Missing);
                continue;
            }

            let kind = MediaKind::classify(&path);
            if !kind.is_supported() {
                plan.skip(track, Some(path), SkipReason::Unsupported);
                continue;
            }

            plan.items.push(PlannedItem {
                track: track.clone(),
                path,
                kind,
            });
        }

        plan
    }

    fn skip(&mut self, track: &Track, path: Option<PathBuf>, reason: SkipReason) {
        self.skipped.push(SkippedTrack {
            track: track.clone(),
            path,
            reason,
        });
    }

    /// Log a warning per skipped entry
    pub fn report_skipped(&self) {
        for skipped in &self.skipped {
            warn!(
                "[{}] {} skipped: {}",
                skipped.track.index,
                skipped.describe(),
                skipped.reason
            );
        }
    }

    /// Error text listing skipped entries, used when skipping is not allowed
    pub fn problems_message(&self) -> String {
        let only_missing = self
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::Missing);

        let mut msg = String::from(if only_missing {
            "Missing files:"
        } else {
            "Unusable playlist entries:"
        });
        for skipped in self.skipped.iter().take(MAX_LISTED_PROBLEMS) {
            msg.push_str(&format!("\n  [{}] {}", skipped.track.index, skipped.describe()));
            if !only_missing {
                msg.push_str(&format!(" ({})", skipped.reason));
            }
        }
        if self.skipped.len() > MAX_LISTED_PROBLEMS {
            msg.push_str(&format!(
                "\n  ... and {} more",
                self.skipped.len() - MAX_LISTED_PROBLEMS
            ));
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn track(index: usize, location: &str) -> Track {
        Track {
            index,
            location: location.to_string(),
            title: None,
            creator: None,
            duration_ms: None,
        }
    }

    #[test]
    fn test_plan_accepts_existing_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("song.mp3"), b"").unwrap();
        fs::write(dir.path().join("clip.mp4"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let playlist = Playlist {
            title: None,
            creator: None,
            tracks: vec![
                track(1, "song.mp3"),
                track(2, "gone.mp3"),
                track(3, "clip.mp4"),
                track(4, "notes.txt"),
                track(5, "http://radio.example/live"),
                track(6, ""),
            ],
        };

        let plan = TrackPlan::build(&playlist, dir.path());

        let accepted: Vec<_> = plan.items.iter().map(|i| (i.track.index, i.kind)).collect();
        assert_eq!(accepted, vec![(1, MediaKind::Audio), (3, MediaKind::Video)]);

        let skipped: Vec<_> = plan
            .skipped
            .iter()
            .map(|s| (s.track.index, s.reason.clone()))
            .collect();
        assert_eq!(
            skipped,
            vec![
                (2, SkipReason::Missing),
                (4, SkipReason::Unsupported),
                (5, SkipReason::Remote { scheme: "http".to_string() }),
                (6, SkipReason::NoLocation),
            ]
        );
    }

    #[test]
    fn test_segment_name_uses_playlist_index() {
        let item = PlannedItem {
            track: track(7, "a.mp3"),
            path: PathBuf::from("a.mp3"),
            kind: MediaKind::Audio,
        };
        assert_eq!(item.segment_name(), "part_007.mp4");
    }

    #[test]
    fn test_problems_message_for_missing_files() {
        let plan = TrackPlan {
            items: vec![],
            skipped: vec![SkippedTrack {
                track: track(2, "file:///music/gone.mp3"),
                path: Some(PathBuf::from("/music/gone.mp3")),
                reason: SkipReason::Missing,
            }],
        };
        assert_eq!(plan.problems_message(), "Missing files:\n  [2] /music/gone.mp3");
    }

    #[test]
    fn test_problems_message_truncates() {
        let skipped = (1..=60)
            .map(|i| SkippedTrack {
                track: track(i, ""),
                path: None,
                reason: SkipReason::NoLocation,
            })
            .collect();
        let plan = TrackPlan { items: vec![], skipped };

        let msg = plan.problems_message();
        assert!(msg.starts_with("Unusable playlist entries:"));
        assert!(msg.contains("[50]"));
        assert!(!msg.contains("[51]"));
        assert!(msg.ends_with("... and 10 more"));
    }
}
