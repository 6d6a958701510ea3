//! ffmpeg invocation building and execution

pub mod args;
pub mod concat;
pub mod ffmpeg;

pub use args::{
    Invocation, concat_invocation, lists_audio_stream, segment_invocation, stream_info_invocation,
};
pub use concat::write_concat_list;
pub use ffmpeg::{EncodeOutcome, Encoder, FfmpegEncoder, locate_ffmpeg};
