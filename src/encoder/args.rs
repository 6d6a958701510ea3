//! Argument lists for the two kinds of ffmpeg calls: per-item segments and the final concat

use anyhow::{Result, bail};
use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use crate::config::EncodeSettings;
use crate::playlist::MediaKind;

/// Arguments for one ffmpeg run (program path excluded)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    pub args: Vec<OsString>,
}

impl Invocation {
    fn new() -> Self {
        Self::default().arg("-hide_banner").arg("-y")
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments as lossy strings, for logging and assertions
    pub fn to_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Last argument, which is always the output file
    pub fn output(&self) -> Option<&Path> {
        self.args.last().map(Path::new)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_strings().join(" "))
    }
}

/// Build the ffmpeg call that turns one playlist item into a normalized segment
///
/// - Audio: black WxH@FPS video synthesized with lavfi, cut to the audio length
/// - Video: scaled to fit WxH, letterboxed, resampled to FPS. A source
///   without audio (`has_audio == false`) gets a silent track from lavfi.
///
/// Every segment ends up as H.264 yuv420p + AAC with identical parameters so
/// the segments can be concatenated with stream copy.
pub fn segment_invocation(
    kind: MediaKind,
    input: &Path,
    has_audio: bool,
    output: &Path,
    settings: &EncodeSettings,
) -> Result<Invocation> {
    let invocation = match kind {
        MediaKind::Audio => {
            let color = format!(
                "color=size={}x{}:rate={}:color={}",
                settings.width, settings.height, settings.fps, settings.pad_color
            );
            Invocation::new()
                .args(["-f", "lavfi", "-i"])
                .arg(color)
                .arg("-i")
                .arg(input)
                .arg("-shortest")
                .args(["-map", "0:v:0", "-map", "1:a:0"])
                .args(video_codec_args(settings))
                .args(["-pix_fmt", "yuv420p", "-r"])
                .arg(settings.fps.to_string())
        }
        MediaKind::Video if has_audio => Invocation::new()
            .arg("-i")
            .arg(input)
            .arg("-vf")
            .arg(video_filter(settings))
            .args(["-map", "0:v:0", "-map", "0:a:0"])
            .args(video_codec_args(settings)),
        MediaKind::Video => Invocation::new()
            .arg("-i")
            .arg(input)
            .args(["-f", "lavfi", "-i"])
            .arg(silence_source(settings))
            .arg("-vf")
            .arg(video_filter(settings))
            .args(["-map", "0:v:0", "-map", "1:a:0", "-shortest"])
            .args(video_codec_args(settings)),
        MediaKind::Unknown => bail!("Unsupported item type for: {}", input.display()),
    };

    Ok(invocation
        .args(audio_codec_args(settings))
        .args(["-movflags", "+faststart"])
        .arg(output))
}

/// Build the call that makes ffmpeg list the streams of `input`
///
/// There is no output file, so ffmpeg exits non-zero after printing the
/// input description to stderr.
pub fn stream_info_invocation(input: &Path) -> Invocation {
    Invocation::default().args(["-hide_banner", "-i"]).arg(input)
}

/// Whether ffmpeg's input description lists an audio stream
pub fn lists_audio_stream(stderr: &str) -> bool {
    stderr.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with("Stream #") && line.contains(": Audio:")
    })
}

/// Build the stream-copy concat of already normalized segments
pub fn concat_invocation(list_file: &Path, output: &Path) -> Invocation {
    Invocation::new()
        .args(["-f", "concat", "-safe", "0", "-i"])
        .arg(list_file)
        .args(["-c", "copy", "-movflags", "+faststart"])
        .arg(output)
}

fn video_filter(s: &EncodeSettings) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease:flags=lanczos,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={pad},setsar=1,format=yuv420p,fps={fps}",
        w = s.width,
        h = s.height,
        pad = s.pad_color,
        fps = s.fps
    )
}

fn silence_source(s: &EncodeSettings) -> String {
    let layout = match s.audio_channels {
        1 => "mono".to_string(),
        2 => "stereo".to_string(),
        n => format!("{}c", n),
    };
    format!("anullsrc=r={}:cl={}", s.audio_sample_rate, layout)
}

fn video_codec_args(s: &EncodeSettings) -> Vec<String> {
    vec![
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        s.preset.clone(),
        "-crf".into(),
        s.crf.to_string(),
    ]
}

fn audio_codec_args(s: &EncodeSettings) -> Vec<String> {
    vec![
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        s.audio_bitrate.clone(),
        "-ar".into(),
        s.audio_sample_rate.to_string(),
        "-ac".into(),
        s.audio_channels.to_string(),
    ]
}
