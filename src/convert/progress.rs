//! Progress bar styling

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Add a per-playlist bar counting encoded segments
pub fn playlist_bar(multi: &MultiProgress, name: &str) -> Result<ProgressBar> {
    let bar = multi.add(ProgressBar::new(0));
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {prefix:.bold} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}",
        )?
        .progress_chars("#>-"),
    );
    bar.set_prefix(name.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}
