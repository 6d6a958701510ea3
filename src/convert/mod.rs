//! Playlist to MP4 conversion

pub mod batch;
pub mod engine;
pub mod plan;
pub mod probe;
pub mod progress;

pub use batch::{BatchSummary, convert_all, find_playlists};
pub use engine::{ConvertEngine, ConvertOptions, output_stem};
pub use plan::{SkipReason, TrackPlan};
