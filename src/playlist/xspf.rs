//! XSPF parsing
//!
//! Only the parts of XSPF the converter needs are read:
//! ```xml
//! <playlist version="1" xmlns="http://xspf.org/ns/0/">
//!   <title>Road Trip</title>
//!   <trackList>
//!     <track>
//!       <location>file:///C:/Music/song.mp3</location>
//!       <title>Song</title>
//!       <creator>Artist</creator>
//!       <duration>215000</duration>
//!     </track>
//!   </trackList>
//! </playlist>
//! ```
//! Elements are matched by local name so files without the XSPF namespace
//! still load.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::location::{LocationError, resolve_location};

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("failed to read playlist {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("not an XSPF playlist (root element is <{0}>)")]
    NotXspf(String),
}

/// A parsed playlist
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub tracks: Vec<Track>,
}

/// One `<track>` entry, in declared order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// 1-based position in the playlist
    pub index: usize,
    /// Raw `<location>` text
    pub location: String,
    pub title: Option<String>,
    pub creator: Option<String>,
    /// Declared `<duration>` in milliseconds
    pub duration_ms: Option<u64>,
}

impl Track {
    /// Resolve this track's location relative to the playlist directory
    pub fn resolve(&self, base_dir: &Path) -> Result<PathBuf, LocationError> {
        resolve_location(&self.location, base_dir)
    }

    pub fn declared_duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }

    /// Title for display, falling back to the location
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.location)
    }
}

impl Playlist {
    /// Load and parse a playlist file
    pub fn load(path: &Path) -> Result<Self, PlaylistError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlaylistError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let playlist = Self::parse(&content)?;
        debug!(
            "Parsed {} tracks from {}",
            playlist.tracks.len(),
            path.display()
        );
        Ok(playlist)
    }

    /// Parse XSPF text
    pub fn parse(xml: &str) -> Result<Self, PlaylistError> {
        let doc =
            roxmltree::Document::parse(xml).map_err(|e| PlaylistError::Xml(e.to_string()))?;

        let root = doc.root_element();
        if root.tag_name().name() != "playlist" {
            return Err(PlaylistError::NotXspf(root.tag_name().name().to_string()));
        }

        let mut playlist = Playlist {
            title: child_text(&root, "title"),
            creator: child_text(&root, "creator"),
            tracks: Vec::new(),
        };

        let track_nodes = root
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "trackList")
            .flat_map(|list| list.children())
            .filter(|n| n.is_element() && n.tag_name().name() == "track");

        for (i, node) in track_nodes.enumerate() {
            playlist.tracks.push(Track {
                index: i + 1,
                location: child_text(&node, "location").unwrap_or_default(),
                title: child_text(&node, "title"),
                creator: child_text(&node, "creator"),
                duration_ms: child_text(&node, "duration").and_then(|d| parse_duration_ms(&d)),
            });
        }

        Ok(playlist)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Trimmed text of the first child element with this local name, if non-empty
fn child_text(node: &roxmltree::Node, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Durations are only trusted when they are plain digits
fn parse_duration_ms(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
