//! CLI module for xspf2mp4

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::convert::ConvertOptions;

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "xspf2mp4", about = "Convert XSPF playlists into single MP4 videos")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (includes ffmpeg output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert one or more playlists
    Convert {
        /// XSPF playlist files
        #[arg(value_name = "PLAYLIST", required = true)]
        playlists: Vec<PathBuf>,

        #[command(flatten)]
        options: ConvertArgs,
    },

    /// Convert every playlist in the input folder
    Batch {
        /// Folder to scan for .xspf files (defaults to the configured input folder)
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        options: ConvertArgs,
    },

    /// Interactively pick playlists from the input folder
    Pick {
        /// Folder to scan for .xspf files (defaults to the configured input folder)
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[command(flatten)]
        options: ConvertArgs,
    },

    /// Show what a playlist would produce without encoding anything
    Check {
        /// XSPF playlist file
        playlist: PathBuf,

        /// Output folder to look for a previous conversion in
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to the ffmpeg binary
        #[arg(long, env = "XSPF2MP4_FFMPEG")]
        ffmpeg: Option<PathBuf>,

        /// Outputs are named after the playlist title
        #[arg(long)]
        name_from_title: bool,
    },

    /// Show or initialize the settings file
    Config {
        /// Write the default settings file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing settings file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Options shared by every command that encodes
#[derive(Args, Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Output folder (defaults to the configured output folder)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to the ffmpeg binary
    #[arg(long, env = "XSPF2MP4_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// Abort when an entry is missing instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Keep the per-item segments after a successful run
    #[arg(long)]
    pub keep_segments: bool,

    /// Name the output after the playlist title instead of its file name
    #[arg(long)]
    pub name_from_title: bool,

    /// Output width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// x264 CRF (lower = better quality, bigger file)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=51))]
    pub crf: Option<u32>,

    /// x264 preset (ultrafast ... veryslow)
    #[arg(long)]
    pub preset: Option<String>,

    /// AAC bitrate, e.g. 192k
    #[arg(long)]
    pub audio_bitrate: Option<String>,
}

impl ConvertArgs {
    /// Layer command-line overrides on top of the loaded settings
    pub fn apply(&self, settings: &mut Settings) {
        let encode = &mut settings.encode;
        if let Some(width) = self.width {
            encode.width = width;
        }
        if let Some(height) = self.height {
            encode.height = height;
        }
        if let Some(fps) = self.fps {
            encode.fps = fps;
        }
        if let Some(crf) = self.crf {
            encode.crf = crf;
        }
        if let Some(preset) = &self.preset {
            encode.preset = preset.clone();
        }
        if let Some(bitrate) = &self.audio_bitrate {
            encode.audio_bitrate = bitrate.clone();
        }
        if let Some(output) = &self.output {
            settings.output_dir = output.clone();
        }
        if let Some(ffmpeg) = &self.ffmpeg {
            settings.ffmpeg = Some(ffmpeg.clone());
        }
    }

    pub fn to_options(&self, settings: &Settings) -> ConvertOptions {
        ConvertOptions {
            output_dir: settings.output_dir.clone(),
            encode: settings.encode.clone(),
            strict: self.strict,
            keep_segments: self.keep_segments,
            name_from_title: self.name_from_title,
        }
    }
}
