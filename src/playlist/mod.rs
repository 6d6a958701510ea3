//! XSPF playlist parsing and track resolution

pub mod location;
pub mod media;
pub mod xspf;

pub use location::LocationError;
pub use media::MediaKind;
pub use xspf::{Playlist, Track};
