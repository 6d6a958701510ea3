//! Converting every playlist in a folder

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::engine::{ConversionOutcome, ConvertEngine};
use super::progress::playlist_bar;
use crate::encoder::Encoder;

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub converted: Vec<ConversionOutcome>,
    /// Playlist and error message
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `*.xspf` files directly inside `dir`, sorted by name
pub fn find_playlists(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read folder {}", dir.display()))?;

    let mut playlists = Vec::new();
    for entry in entries {
        let path = entry.context("Failed to read folder entry")?.path();
        let is_xspf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xspf"));
        if is_xspf && path.is_file() {
            playlists.push(path);
        }
    }

    playlists.sort();
    Ok(playlists)
}

/// Convert playlists one after another; a failure is logged and the batch goes on
pub async fn convert_all<E: Encoder>(
    engine: &ConvertEngine<E>,
    playlists: &[PathBuf],
    multi: &MultiProgress,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    if playlists.is_empty() {
        warn!("Place .xspf files into the input folder and try again.");
        return Ok(summary);
    }

    for playlist in playlists {
        let name = playlist
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("=== Processing: {} ===", name);

        let bar = playlist_bar(multi, &name)?;
        match engine.convert(playlist, &bar).await {
            Ok(outcome) => summary.converted.push(outcome),
            Err(e) => {
                bar.abandon_with_message("failed");
                error!("ERROR: {:#}", e);
                summary.failed.push((playlist.clone(), format!("{:#}", e)));
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::engine::ConvertOptions;
    use crate::convert::engine::tests::{RecordingEncoder, write_playlist};
    use indicatif::ProgressDrawTarget;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn test_find_playlists_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xspf", "a.XSPF", "notes.txt", "c.m3u"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("folder.xspf")).unwrap();

        let found = find_playlists(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.XSPF", "b.xspf"]);
    }

    #[test]
    fn test_find_playlists_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_playlists(&dir.path().join("input")).is_err());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"").unwrap();
        let good = write_playlist(dir.path(), "good.xspf", &["a.mp3"]);
        let bad = dir.path().join("bad.xspf");
        std::fs::write(&bad, "<playlist><trackList>").unwrap();
        let also_good = write_playlist(dir.path(), "later.xspf", &["a.mp3"]);

        let options = ConvertOptions {
            output_dir: dir.path().join("out"),
            ..ConvertOptions::default()
        };
        let engine = ConvertEngine::new(RecordingEncoder::default(), options).unwrap();

        let summary = convert_all(&engine, &[bad.clone(), good, also_good], &hidden())
            .await
            .unwrap();

        assert_eq!(summary.converted.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, bad);
        assert!(summary.failed[0].1.contains("XML parse error"));
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn test_shared_titles_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"").unwrap();
        std::fs::write(dir.path().join("b.mp3"), b"").unwrap();
        // both playlists are titled "Road Trip"
        let first = write_playlist(dir.path(), "first.xspf", &["a.mp3"]);
        let second = write_playlist(dir.path(), "second.xspf", &["b.mp3"]);

        let out = dir.path().join("out");
        let options = ConvertOptions {
            output_dir: out.clone(),
            name_from_title: true,
            ..ConvertOptions::default()
        };
        let engine = ConvertEngine::new(RecordingEncoder::default(), options).unwrap();
        let summary = convert_all(&engine, &[first, second], &hidden()).await.unwrap();

        let outputs: Vec<_> = summary.converted.iter().map(|o| o.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![out.join("Road Trip.mp4"), out.join("Road Trip (2).mp4")]
        );
        assert!(outputs.iter().all(|o| o.exists()));
        assert_ne!(summary.converted[0].report, summary.converted[1].report);

        let second_report =
            crate::report::ConversionReport::load(&summary.converted[1].report).unwrap();
        assert!(second_report.encoded[0].path.ends_with("b.mp3"));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let engine =
            ConvertEngine::new(RecordingEncoder::default(), ConvertOptions::default()).unwrap();
        let summary = convert_all(&engine, &[], &hidden()).await.unwrap();
        assert!(summary.converted.is_empty());
        assert!(summary.is_success());
    }
}
