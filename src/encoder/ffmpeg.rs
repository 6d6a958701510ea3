//! Locating and running the ffmpeg binary

use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use super::{Invocation, lists_audio_stream, stream_info_invocation};

#[cfg(windows)]
const FFMPEG_NAME: &str = "ffmpeg.exe";
#[cfg(not(windows))]
const FFMPEG_NAME: &str = "ffmpeg";

/// How many trailing output lines are kept for error reports
const TAIL_LINES: usize = 20;

/// Where the ffmpeg binary was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FfmpegLocation {
    /// Given on the command line, via env or in the config file
    Explicit(PathBuf),
    /// Sitting next to our own executable
    Bundled(PathBuf),
    /// Found on PATH
    SystemPath(PathBuf),
}

impl FfmpegLocation {
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(p) | Self::Bundled(p) | Self::SystemPath(p) => p,
        }
    }
}

impl fmt::Display for FfmpegLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self {
            Self::Explicit(_) => "configured",
            Self::Bundled(_) => "found",
            Self::SystemPath(_) => "PATH",
        };
        write!(f, "{} ({})", self.path().display(), source)
    }
}

/// Find ffmpeg: explicit path, then next to the executable, then PATH
pub fn locate_ffmpeg(explicit: Option<&Path>) -> Result<FfmpegLocation> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(FfmpegLocation::Explicit(path.to_path_buf()));
        }
        anyhow::bail!("ffmpeg not found at {}", path.display());
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let candidate = dir.join(FFMPEG_NAME);
        if candidate.is_file() {
            return Ok(FfmpegLocation::Bundled(candidate));
        }
    }

    let path = search_path(std::env::var_os("PATH")).with_context(|| {
        format!(
            "Missing ffmpeg: place {} next to this program or install it on PATH",
            FFMPEG_NAME
        )
    })?;
    Ok(FfmpegLocation::SystemPath(path))
}

/// Executable ffmpeg in one of the `paths` directories
fn search_path(paths: Option<OsString>) -> Result<PathBuf, which::Error> {
    which::which_in(FFMPEG_NAME, paths, Path::new("."))
}

/// Exit status and trailing output of one encoder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOutcome {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    pub tail: Vec<String>,
}

impl EncodeOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code for messages, -1 when there was none
    pub fn code_or_signal(&self) -> i32 {
        self.code.unwrap_or(-1)
    }
}

/// Something that can execute an ffmpeg invocation
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn run(&self, invocation: &Invocation, progress: &ProgressBar) -> Result<EncodeOutcome>;

    /// Whether `input` carries at least one audio stream
    async fn has_audio(&self, input: &Path) -> Result<bool>;
}

/// Runs the real ffmpeg binary as a subprocess
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn run(&self, invocation: &Invocation, progress: &ProgressBar) -> Result<EncodeOutcome> {
        if let Some(output) = invocation.output() {
            debug!("Writing {}", output.display());
        }
        debug!("Running: {} {}", self.program.display(), invocation);

        let mut cmd = Command::new(&self.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program.display()))?;

        let mut tail = VecDeque::with_capacity(TAIL_LINES);
        if let Some(mut stderr) = child.stderr.take() {
            let mut splitter = LineSplitter::default();
            let mut buf = [0u8; 4096];
            loop {
                let n = stderr
                    .read(&mut buf)
                    .await
                    .context("Failed to read ffmpeg output")?;
                let lines = if n == 0 {
                    splitter.finish()
                } else {
                    splitter.push(&buf[..n])
                };

                for line in lines {
                    handle_line(line, &mut tail, progress);
                }
                if n == 0 {
                    break;
                }
            }
        }

        let status = child.wait().await.context("ffmpeg process error")?;

        Ok(EncodeOutcome {
            code: status.code(),
            tail: tail.into_iter().collect(),
        })
    }

    async fn has_audio(&self, input: &Path) -> Result<bool> {
        let invocation = stream_info_invocation(input);
        debug!("Running: {} {}", self.program.display(), invocation);

        let mut cmd = Command::new(&self.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        // exit status is always non-zero here, only the description matters
        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to start {}", self.program.display()))?;
        let found = lists_audio_stream(&String::from_utf8_lossy(&output.stderr));
        debug!("{} has audio: {}", input.display(), found);
        Ok(found)
    }
}

fn handle_line(line: String, tail: &mut VecDeque<String>, progress: &ProgressBar) {
    if let Some(position) = parse_progress_time(&line) {
        progress.set_message(format!("encoded {}", crate::utils::format_duration(position)));
    }
    debug!("ffmpeg: {}", line);

    if tail.len() == TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

/// Splits a byte stream into lines on `\n` or `\r`
///
/// ffmpeg rewrites its stats line with carriage returns, so splitting on
/// newlines alone would only surface progress once the run is over.
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in bytes {
            if b == b'\n' || b == b'\r' {
                self.flush_into(&mut lines);
            } else {
                self.pending.push(b);
            }
        }
        lines
    }

    fn finish(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        self.flush_into(&mut lines);
        lines
    }

    fn flush_into(&mut self, lines: &mut Vec<String>) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        if !line.is_empty() {
            lines.push(line);
        }
    }
}

/// Extract `time=HH:MM:SS.xx` from an ffmpeg stats line
fn parse_progress_time(line: &str) -> Option<Duration> {
    let value = line.split("time=").nth(1)?.split_whitespace().next()?;

    let mut parts = value.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    Some(Duration::from_secs(hours * 3600 + minutes * 60) + Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_time() {
        let line = "frame=  120 fps= 60 q=28.0 size=     512kB time=00:01:04.50 bitrate= 650.2kbits/s speed=2.01x";
        assert_eq!(parse_progress_time(line), Some(Duration::from_millis(64_500)));
    }

    #[test]
    fn test_parse_progress_time_unavailable() {
        assert_eq!(parse_progress_time("size=N/A time=N/A bitrate=N/A"), None);
        assert_eq!(parse_progress_time("Input #0, mp3, from 'song.mp3':"), None);
    }

    #[test]
    fn test_line_splitter_handles_carriage_returns() {
        let mut splitter = LineSplitter::default();
        let mut lines = splitter.push(b"Input #0\nframe=1 time=00:00:01.00\rframe=2 ti");
        lines.extend(splitter.push(b"me=00:00:02.00\r\n"));
        lines.extend(splitter.push(b"done"));
        lines.extend(splitter.finish());

        assert_eq!(
            lines,
            vec![
                "Input #0",
                "frame=1 time=00:00:01.00",
                "frame=2 time=00:00:02.00",
                "done",
            ]
        );
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        let progress = ProgressBar::hidden();
        let mut tail = VecDeque::new();
        for i in 0..(TAIL_LINES + 5) {
            handle_line(format!("line {}", i), &mut tail, &progress);
        }
        assert_eq!(tail.len(), TAIL_LINES);
        assert_eq!(tail.front().map(String::as_str), Some("line 5"));
    }

    #[test]
    fn test_outcome_success() {
        assert!(EncodeOutcome { code: Some(0), tail: vec![] }.success());
        let killed = EncodeOutcome { code: None, tail: vec![] };
        assert!(!killed.success());
        assert_eq!(killed.code_or_signal(), -1);
    }

    #[cfg(unix)]
    #[test]
    fn test_path_lookup_skips_non_executables() {
        use std::os::unix::fs::PermissionsExt;

        let plain = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        std::fs::write(plain.path().join(FFMPEG_NAME), b"").unwrap();
        let exe = bin.path().join(FFMPEG_NAME);
        std::fs::write(&exe, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let both = std::env::join_paths([plain.path(), bin.path()]).unwrap();
        assert_eq!(search_path(Some(both)).unwrap(), exe);

        let only_plain = std::env::join_paths([plain.path()]).unwrap();
        assert!(search_path(Some(only_plain)).is_err());
    }

    #[test]
    fn test_explicit_location_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locate_ffmpeg(Some(&dir.path().join("ffmpeg"))).is_err());

        let bin = dir.path().join("my-ffmpeg");
        std::fs::write(&bin, b"").unwrap();
        assert_eq!(
            locate_ffmpeg(Some(&bin)).unwrap(),
            FfmpegLocation::Explicit(bin.clone())
        );
    }
}
