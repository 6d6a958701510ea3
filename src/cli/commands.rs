//! CLI command handlers

use anyhow::{Context, Result};
use clap_complete::generate;
use colored::Colorize;
use dialoguer::Select;
use indicatif::MultiProgress;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::ConvertArgs;
use crate::config::Settings;
use crate::convert::{self, BatchSummary, ConvertEngine, SkipReason, TrackPlan};
use crate::encoder::{FfmpegEncoder, locate_ffmpeg};
use crate::playlist::Playlist;
use crate::report::ConversionReport;
use crate::utils::format_duration;

/// Handle the `convert` command
pub async fn convert(playlists: Vec<PathBuf>, args: ConvertArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    run_playlists(&playlists, &args, &settings).await
}

/// Handle the `batch` command
pub async fn batch(input: Option<PathBuf>, args: ConvertArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    let input = input.unwrap_or_else(|| settings.input_dir.clone());

    let Some(playlists) = scan_input(&input, &settings)? else {
        return Ok(());
    };

    run_playlists(&playlists, &args, &settings).await?;

    println!(
        "Finished processing all playlists. Check the '{}' folder.",
        settings.output_dir.display()
    );
    Ok(())
}

/// Handle the `pick` command
pub async fn pick(input: Option<PathBuf>, args: ConvertArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    let input = input.unwrap_or_else(|| settings.input_dir.clone());

    let Some(playlists) = scan_input(&input, &settings)? else {
        return Ok(());
    };

    let mut items = vec![format!("All playlists ({})", playlists.len())];
    items.extend(
        playlists
            .iter()
            .map(|p| p.file_name().unwrap_or_default().to_string_lossy().into_owned()),
    );

    let choice = Select::new()
        .with_prompt("Choose a playlist to convert")
        .items(&items)
        .default(0)
        .interact_opt()
        .context("Failed to read selection")?;

    let selected = match choice {
        None => {
            println!("{}", "Nothing selected.".yellow());
            return Ok(());
        }
        Some(0) => playlists,
        Some(i) => vec![playlists[i - 1].clone()],
    };

    run_playlists(&selected, &args, &settings).await
}

/// Handle the `check` command
pub fn check(
    playlist_path: PathBuf,
    output: Option<PathBuf>,
    ffmpeg: Option<PathBuf>,
    name_from_title: bool,
) -> Result<()> {
    let settings = Settings::load()?;
    let output_dir = output.unwrap_or_else(|| settings.output_dir.clone());

    let playlist = Playlist::load(&playlist_path)?;
    let title = playlist.title.as_deref().unwrap_or("(untitled)");
    match playlist.creator.as_deref() {
        Some(creator) => println!(
            "{} - {} by {}",
            playlist_path.display().to_string().green().bold(),
            title,
            creator
        ),
        None => println!("{} - {}", playlist_path.display().to_string().green().bold(), title),
    }

    if playlist.is_empty() {
        println!("  {}", "No tracks found in playlist.".yellow());
        return Ok(());
    }

    let base_dir = playlist_path.parent().unwrap_or(Path::new(""));
    let plan = TrackPlan::build(&playlist, base_dir);

    let mut lines: Vec<(usize, String)> = plan
        .items
        .iter()
        .map(|item| {
            let line = format!(
                "  [{:>3}] {:<7} {}  {}",
                item.track.index,
                item.kind.to_string(),
                "ok".green(),
                item.path.display()
            );
            (item.track.index, line)
        })
        .collect();
    lines.extend(plan.skipped.iter().map(|s| {
        let status = match s.reason {
            SkipReason::Missing => "missing".red(),
            _ => "skip".yellow(),
        };
        let line = format!(
            "  [{:>3}] {:<7} {}  {} ({})",
            s.track.index,
            "-",
            status,
            s.describe(),
            s.reason
        );
        (s.track.index, line)
    }));
    lines.sort_by_key(|(index, _)| *index);

    for (_, line) in &lines {
        println!("{}", line);
    }

    println!();
    println!(
        "  {} segment(s), {} skipped",
        plan.items.len(),
        plan.skipped.len()
    );

    let declared: Option<Duration> = plan
        .items
        .iter()
        .map(|i| i.track.declared_duration())
        .sum();
    if let Some(total) = declared {
        println!("  Declared length: {}", format_duration(total));
    }

    match locate_ffmpeg(ffmpeg.or(settings.ffmpeg.clone()).as_deref()) {
        Ok(location) => println!("  ffmpeg: {}", location),
        Err(e) => println!("  ffmpeg: {}", e.to_string().red()),
    }

    let previous = previous_report_path(&output_dir, &playlist_path, &playlist, name_from_title);
    if previous.exists() {
        let report = ConversionReport::load(&previous)?;
        println!(
            "  Last converted {} -> {} ({} skipped)",
            report.created_at.format("%Y-%m-%d %H:%M"),
            report.output.display(),
            report.skipped.len()
        );
    } else {
        println!("  No previous conversion in {}", output_dir.display());
    }

    Ok(())
}

/// Where a conversion of this playlist into `output_dir` left its report
fn previous_report_path(
    output_dir: &Path,
    playlist_path: &Path,
    playlist: &Playlist,
    name_from_title: bool,
) -> PathBuf {
    let stem = convert::output_stem(playlist_path, playlist, name_from_title);
    ConversionReport::path_for(&output_dir.join(format!("{}.mp4", stem)))
}

/// Handle the `config` command
pub fn config(init: bool, force: bool) -> Result<()> {
    let path = Settings::config_path()?;

    if init {
        if path.exists() && !force {
            println!(
                "{} already exists. Use {} to overwrite it.",
                path.display(),
                "--force".cyan()
            );
            return Ok(());
        }
        let path = Settings::default().save()?;
        println!("{} {}", "Wrote default settings to".green(), path.display());
        return Ok(());
    }

    let settings = Settings::load()?;
    let marker = if path.exists() { "" } else { " (not created yet, showing defaults)" };
    println!("Settings file: {}{}", path.display(), marker);
    println!(
        "{}",
        serde_json::to_string_pretty(&settings).context("Failed to serialize settings")?
    );
    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = <super::Cli as clap::CommandFactory>::command();
    generate(shell, &mut cmd, "xspf2mp4", &mut io::stdout());
}

fn load_settings(args: &ConvertArgs) -> Result<Settings> {
    let mut settings = Settings::load()?;
    args.apply(&mut settings);
    Ok(settings)
}

/// Make sure input/output folders exist and list the playlists in the input
/// folder; `None` when there is nothing to do
fn scan_input(input: &Path, settings: &Settings) -> Result<Option<Vec<PathBuf>>> {
    for dir in [input, settings.output_dir.as_path()] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create folder {}", dir.display()))?;
    }

    let playlists = convert::find_playlists(input)?;
    if playlists.is_empty() {
        println!(
            "{}",
            format!(
                "Place .xspf files into the '{}' folder and try again.",
                input.display()
            )
            .yellow()
        );
        return Ok(None);
    }
    Ok(Some(playlists))
}

async fn run_playlists(playlists: &[PathBuf], args: &ConvertArgs, settings: &Settings) -> Result<()> {
    let location = locate_ffmpeg(settings.ffmpeg.as_deref())?;
    println!("{} {}", "ffmpeg:".cyan(), location);

    let engine = ConvertEngine::new(
        FfmpegEncoder::new(location.path().to_path_buf()),
        args.to_options(settings),
    )?;

    let multi = MultiProgress::new();
    let summary = convert::convert_all(&engine, playlists, &multi).await?;

    print_summary(&summary);

    if !summary.is_success() {
        anyhow::bail!(
            "{} of {} playlist(s) failed",
            summary.failed.len(),
            playlists.len()
        );
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!();
    for outcome in &summary.converted {
        println!("{} {}", "Done:".green().bold(), outcome.output.display());
        print!("  Segments: {}", outcome.segments);
        if !outcome.skipped.is_empty() {
            print!(", {}", format!("{} skipped", outcome.skipped.len()).yellow());
        }
        match (outcome.measured_duration, outcome.expected_duration) {
            (Some(measured), Some(expected)) => print!(
                ", length {} (segments {})",
                format_duration(measured),
                format_duration(expected)
            ),
            (Some(measured), None) => print!(", length {}", format_duration(measured)),
            _ => {}
        }
        if outcome.duration_matches == Some(false) {
            print!(" {}", "(length mismatch)".yellow());
        }
        println!();
        for skipped in &outcome.skipped {
            println!(
                "    [{}] {} ({})",
                skipped.track.index,
                skipped.describe(),
                skipped.reason
            );
        }
        println!("  Report: {}", outcome.report.display());
    }

    for (playlist, message) in &summary.failed {
        println!("{} {}", "Failed:".red().bold(), playlist.display());
        for line in message.lines() {
            println!("  {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: Option<&str>) -> Playlist {
        Playlist {
            title: title.map(str::to_string),
            creator: None,
            tracks: vec![],
        }
    }

    #[test]
    fn test_previous_report_follows_output_dir() {
        let path = previous_report_path(
            Path::new("/srv/videos"),
            Path::new("/lists/v1.2 mix.xspf"),
            &titled(Some("Summer")),
            false,
        );
        assert_eq!(path, Path::new("/srv/videos").join("v1.2 mix.report.json"));
    }

    #[test]
    fn test_previous_report_follows_title_naming() {
        let playlist = titled(Some("Summer: Best Of"));
        let path = previous_report_path(
            Path::new("out"),
            Path::new("mix.xspf"),
            &playlist,
            true,
        );
        assert_eq!(path, Path::new("out").join("Summer_ Best Of.report.json"));

        let untitled = previous_report_path(Path::new("out"), Path::new("mix.xspf"), &titled(None), true);
        assert_eq!(untitled, Path::new("out").join("mix.report.json"));
    }
}
