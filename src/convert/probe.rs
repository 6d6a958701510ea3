//! Duration probing via lofty
//!
//! Used to check that the concatenated output is as long as its segments.
//! Probing is best effort: anything lofty can't read just yields `None`.

use anyhow::{Context, Result};
use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Duration of a media file, if it can be determined
pub async fn media_duration(path: &Path) -> Option<Duration> {
    let owned = path.to_path_buf();
    match tokio::task::spawn_blocking(move || probe_duration(&owned)).await {
        Ok(Ok(duration)) => Some(duration),
        Ok(Err(e)) => {
            debug!("Could not probe duration of {}: {:#}", path.display(), e);
            None
        }
        Err(e) => {
            warn!("Duration probe task panicked: {}", e);
            None
        }
    }
}

/// Sum of all durations, `None` if any of them is unknown
pub async fn total_duration(paths: &[PathBuf]) -> Option<Duration> {
    let mut total = Duration::ZERO;
    for path in paths {
        total += media_duration(path).await?;
    }
    Some(total)
}

fn probe_duration(path: &Path) -> Result<Duration> {
    let tagged_file = Probe::open(path)
        .context("Failed to open media file")?
        .read()
        .context("Failed to read media file")?;

    let duration = tagged_file.properties().duration();
    if duration.is_zero() {
        anyhow::bail!("no duration in stream properties");
    }
    Ok(duration)
}
