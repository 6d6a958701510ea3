//! Per-playlist conversion: plan, encode segments, concatenate

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use super::plan::{SkippedTrack, TrackPlan};
use super::probe;
use crate::config::EncodeSettings;
use crate::encoder::{self, EncodeOutcome, Encoder};
use crate::playlist::{MediaKind, Playlist};
use crate::report::ConversionReport;
use crate::utils::{durations_match, format_duration, sanitize_filename};

/// Allowed difference between the output and the sum of its segments
const DURATION_TOLERANCE: Duration = Duration::from_secs(1);

/// Options for a conversion run
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Where MP4s, reports and work folders go
    pub output_dir: PathBuf,
    pub encode: EncodeSettings,
    /// Abort on missing/unusable entries instead of skipping them
    pub strict: bool,
    /// Keep `<stem>_work` after a successful run
    pub keep_segments: bool,
    /// Name outputs after the playlist `<title>` instead of the file name
    pub name_from_title: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            encode: EncodeSettings::default(),
            strict: false,
            keep_segments: false,
            name_from_title: false,
        }
    }
}

/// Result of converting one playlist
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub output: PathBuf,
    pub report: PathBuf,
    pub segments: usize,
    pub skipped: Vec<SkippedTrack>,
    pub expected_duration: Option<Duration>,
    pub measured_duration: Option<Duration>,
    /// `None` when either duration could not be read
    pub duration_matches: Option<bool>,
}

/// Converts playlists one at a time through an [`Encoder`]
pub struct ConvertEngine<E> {
    encoder: E,
    options: ConvertOptions,
    /// Lowercased output stems already handed out by this engine
    claimed: Mutex<HashSet<String>>,
}

impl<E: Encoder> ConvertEngine<E> {
    /// Create a new engine
    ///
    /// The output directory is made absolute because the concat list holds
    /// segment paths that ffmpeg resolves relative to the list file.
    pub fn new(encoder: E, mut options: ConvertOptions) -> Result<Self> {
        options.output_dir = std::path::absolute(&options.output_dir).with_context(|| {
            format!("Invalid output directory {}", options.output_dir.display())
        })?;
        Ok(Self {
            encoder,
            options,
            claimed: Mutex::default(),
        })
    }

    /// Convert a single playlist into `<output_dir>/<name>.mp4`
    pub async fn convert(
        &self,
        playlist_path: &Path,
        progress: &ProgressBar,
    ) -> Result<ConversionOutcome> {
        info!("Converting: {}", playlist_path.display());

        let playlist = Playlist::load(playlist_path)?;
        if playlist.is_empty() {
            anyhow::bail!("No tracks found in playlist.");
        }

        let base_dir = playlist_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let plan = TrackPlan::build(&playlist, &base_dir);

        if !plan.skipped.is_empty() {
            if self.options.strict {
                anyhow::bail!(plan.problems_message());
            }
            plan.report_skipped();
        }
        if plan.items.is_empty() {
            anyhow::bail!("No playable tracks in playlist ({} skipped)", plan.skipped.len());
        }

        let stem = self.claim_stem(output_stem(playlist_path, &playlist, self.options.name_from_title));
        fs::create_dir_all(&self.options.output_dir)
            .await
            .with_context(|| {
                format!("Failed to create output directory {}", self.options.output_dir.display())
            })?;
        let work_dir = self.options.output_dir.join(format!("{}_work", stem));
        fs::create_dir_all(&work_dir)
            .await
            .with_context(|| format!("Failed to create work directory {}", work_dir.display()))?;

        let total = plan.items.len();
        progress.set_length(total as u64);
        progress.set_position(0);

        let mut parts = Vec::with_capacity(total);
        for (i, item) in plan.items.iter().enumerate() {
            let segment = work_dir.join(item.segment_name());
            info!("- [{}/{}] {}: {}", i + 1, total, item.kind, item.path.display());
            progress.set_message(item.track.display_name().to_string());

            let has_audio = match item.kind {
                MediaKind::Video => self.encoder.has_audio(&item.path).await?,
                _ => true,
            };
            if !has_audio {
                info!("  no audio stream, adding silence");
            }

            let invocation = encoder::segment_invocation(
                item.kind,
                &item.path,
                has_audio,
                &segment,
                &self.options.encode,
            )?;
            let outcome = self.encoder.run(&invocation, progress).await?;
            if !outcome.success() {
                anyhow::bail!(
                    "ffmpeg failed on item {} ({}) with code {}{}",
                    item.track.index,
                    item.path.display(),
                    outcome.code_or_signal(),
                    format_tail(&outcome)
                );
            }

            parts.push(segment);
            progress.inc(1);
        }

        let output = self.options.output_dir.join(format!("{}.mp4", stem));
        info!("Concatenating {} segments…", parts.len());
        progress.set_message("concatenating");

        let list = encoder::write_concat_list(&work_dir.join("concat.txt"), &parts).await?;
        let outcome = self
            .encoder
            .run(&encoder::concat_invocation(&list, &output), progress)
            .await?;
        if !outcome.success() {
            anyhow::bail!(
                "Concatenation failed with code {}{}",
                outcome.code_or_signal(),
                format_tail(&outcome)
            );
        }

        let expected_duration = probe::total_duration(&parts).await;
        let measured_duration = probe::media_duration(&output).await;
        let duration_matches = check_duration(&output, expected_duration, measured_duration);

        let report = ConversionReport::new(playlist_path, playlist.title.clone(), &output, &plan)
            .with_durations(expected_duration, measured_duration)
            .save()
            .await?;

        if self.options.keep_segments {
            debug!("Keeping segments in {}", work_dir.display());
        } else if let Err(e) = fs::remove_dir_all(&work_dir).await {
            warn!("Failed to remove work directory {}: {}", work_dir.display(), e);
        }

        progress.finish_with_message(format!("Done: {}", output.display()));
        info!("Done: {}", output.display());

        Ok(ConversionOutcome {
            output,
            report,
            segments: parts.len(),
            skipped: plan.skipped,
            expected_duration,
            measured_duration,
            duration_matches,
        })
    }

    /// Reserve `stem` for this run, adding ` (2)`, ` (3)`... when another
    /// playlist already produced an output with that name
    fn claim_stem(&self, stem: String) -> String {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);

        let mut candidate = stem.clone();
        let mut n = 2;
        while !claimed.insert(candidate.to_lowercase()) {
            candidate = format!("{} ({})", stem, n);
            n += 1;
        }
        if candidate != stem {
            warn!("Output name '{}' already used in this run, writing '{}' instead", stem, candidate);
        }
        candidate
    }

}

/// Output file stem: sanitized playlist title if asked for and present,
/// otherwise the playlist file name
pub fn output_stem(playlist_path: &Path, playlist: &Playlist, name_from_title: bool) -> String {
    if name_from_title
        && let Some(title) = playlist.title.as_deref()
    {
        let name = sanitize_filename(title);
        if !name.is_empty() {
            return name;
        }
    }

    playlist_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "playlist".to_string())
}

/// Compare the output length with the sum of its segments; `None` when
/// either is unknown
fn check_duration(
    output: &Path,
    expected: Option<Duration>,
    measured: Option<Duration>,
) -> Option<bool> {
    match (expected, measured) {
        (Some(expected), Some(measured)) if !durations_match(expected, measured, DURATION_TOLERANCE) => {
            warn!(
                "{} is {} long but its segments add up to {}",
                output.display(),
                format_duration(measured),
                format_duration(expected)
            );
            Some(false)
        }
        (Some(_), Some(measured)) => {
            debug!("Output duration {} matches segments", format_duration(measured));
            Some(true)
        }
        _ => {
            debug!("Skipping duration check for {}", output.display());
            None
        }
    }
}

fn format_tail(outcome: &EncodeOutcome) -> String {
    if outcome.tail.is_empty() {
        String::new()
    } else {
        format!("\n{}", outcome.tail.join("\n"))
    }
}
