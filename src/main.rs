//! xspf2mp4 - Convert XSPF playlists into single MP4 videos

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod convert;
mod encoder;
mod playlist;
mod report;
mod utils;

use cli::{Cli, Commands};

// Encodes run one after another, a single thread is all we need
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "xspf2mp4=debug"
    } else {
        "xspf2mp4=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Convert { playlists, options } => {
            cli::commands::convert(playlists, options).await?;
        }
        Commands::Batch { input, options } => {
            cli::commands::batch(input, options).await?;
        }
        Commands::Pick { input, options } => {
            cli::commands::pick(input, options).await?;
        }
        Commands::Check {
            playlist,
            output,
            ffmpeg,
            name_from_title,
        } => {
            cli::commands::check(playlist, output, ffmpeg, name_from_title)?;
        }
        Commands::Config { init, force } => {
            cli::commands::config(init, force)?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
