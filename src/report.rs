//! Conversion report written next to each output video

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::convert::plan::{SkipReason, TrackPlan};
use crate::playlist::MediaKind;

/// What went into an output file and what was left out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Report format version
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub playlist: PathBuf,
    pub title: Option<String>,
    pub output: PathBuf,
    pub encoded: Vec<EncodedItem>,
    pub skipped: Vec<SkippedItem>,
    /// Sum of segment durations
    pub expected_duration_secs: Option<f64>,
    /// Duration of the concatenated file
    pub measured_duration_secs: Option<f64>,
}

/// Record of an encoded entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedItem {
    pub index: usize,
    pub path: PathBuf,
    pub kind: MediaKind,
    pub title: Option<String>,
    pub creator: Option<String>,
}

/// Record of a skipped entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    pub index: usize,
    pub location: String,
    pub path: Option<PathBuf>,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl ConversionReport {
    pub fn new(playlist: &Path, title: Option<String>, output: &Path, plan: &TrackPlan) -> Self {
        Self {
            version: 1,
            created_at: Utc::now(),
            playlist: playlist.to_path_buf(),
            title,
            output: output.to_path_buf(),
            encoded: plan
                .items
                .iter()
                .map(|item| EncodedItem {
                    index: item.track.index,
                    path: item.path.clone(),
                    kind: item.kind,
                    title: item.track.title.clone(),
                    creator: item.track.creator.clone(),
                })
                .collect(),
            skipped: plan
                .skipped
                .iter()
                .map(|s| SkippedItem {
                    index: s.track.index,
                    location: s.track.location.clone(),
                    path: s.path.clone(),
                    reason: s.reason.clone(),
                })
                .collect(),
            expected_duration_secs: None,
            measured_duration_secs: None,
        }
    }

    pub fn with_durations(mut self, expected: Option<Duration>, measured: Option<Duration>) -> Self {
        self.expected_duration_secs = expected.map(|d| d.as_secs_f64());
        self.measured_duration_secs = measured.map(|d| d.as_secs_f64());
        self
    }

    /// `<output_dir>/<stem>.report.json`
    pub fn path_for(output: &Path) -> PathBuf {
        output.with_extension("report.json")
    }

    /// Save next to the output file
    pub async fn save(&self) -> Result<PathBuf> {
        let path = Self::path_for(&self.output);

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize report")?;

        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        debug!("Saved report to {}", path.display());
        Ok(path)
    }

    /// Load a previously written report
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read report {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::plan::{PlannedItem, SkippedTrack};
    use crate::playlist::Track;

    fn track(index: usize, location: &str) -> Track {
        Track {
            index,
            location: location.to_string(),
            title: Some(format!("Track {}", index)),
            creator: None,
            duration_ms: None,
        }
    }

    fn sample_plan() -> TrackPlan {
        TrackPlan {
            items: vec![PlannedItem {
                track: track(1, "a.mp3"),
                path: PathBuf::from("/m/a.mp3"),
                kind: MediaKind::Audio,
            }],
            skipped: vec![SkippedTrack {
                track: track(2, "http://x/y"),
                path: None,
                reason: SkipReason::Remote {
                    scheme: "http".to_string(),
                },
            }],
        }
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            ConversionReport::path_for(Path::new("/out/Road Trip.mp4")),
            PathBuf::from("/out/Road Trip.report.json")
        );
    }

    #[test]
    fn test_skip_reason_flattened_in_json() {
        let report = ConversionReport::new(
            Path::new("/p/mix.xspf"),
            None,
            Path::new("/out/mix.mp4"),
            &sample_plan(),
        );
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["encoded"][0]["kind"], "audio");
        assert_eq!(json["skipped"][0]["index"], 2);
        assert_eq!(json["skipped"][0]["reason"], "remote");
        assert_eq!(json["skipped"][0]["scheme"], "http");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("mix.mp4");
        let report = ConversionReport::new(Path::new("mix.xspf"), Some("Mix".into()), &output, &sample_plan())
            .with_durations(Some(Duration::from_secs(90)), Some(Duration::from_millis(90_250)));

        let path = report.save().await.unwrap();
        assert_eq!(path, dir.path().join("mix.report.json"));

        let loaded = ConversionReport::load(&path).unwrap();
        assert_eq!(loaded.encoded.len(), 1);
        assert_eq!(loaded.skipped[0].reason, report.skipped[0].reason);
        assert_eq!(loaded.expected_duration_secs, Some(90.0));
        assert_eq!(loaded.measured_duration_secs, Some(90.25));
    }
}
