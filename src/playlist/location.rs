//! Resolve XSPF `<location>` values to local file paths
//!
//! Players write locations in a few shapes:
//! - `file:///C:/Users/me/Music/a%20song.mp3` (VLC on Windows)
//! - `file:///home/me/Music/a%20song.mp3`
//! - bare Windows paths like `C:\Music\song.mp3`
//! - references relative to the playlist file

use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Why a location could not be turned into a local path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("track has no location")]
    Empty,

    #[error("not a local file ({0})")]
    Remote(String),

    #[error("invalid file URI: {0}")]
    InvalidUri(String),
}

/// Resolve a raw location against the directory the playlist lives in
pub fn resolve_location(raw: &str, base_dir: &Path) -> Result<PathBuf, LocationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LocationError::Empty);
    }

    if is_drive_path(raw) {
        return Ok(PathBuf::from(native_separators(raw)));
    }

    // "Artist: Song.mp3" parses as a URL too, so only `scheme://` counts
    match Url::parse(raw) {
        Ok(url) if url.scheme() == "file" => file_url_to_path(&url, raw),
        Ok(url) if raw.contains("://") => Err(LocationError::Remote(url.scheme().to_string())),
        _ => {
            let decoded = percent_decode(raw)?;
            Ok(base_dir.join(native_separators(&decoded)))
        }
    }
}

fn file_url_to_path(url: &Url, raw: &str) -> Result<PathBuf, LocationError> {
    let mut path = percent_decode(url.path())
        .map_err(|_| LocationError::InvalidUri(raw.to_string()))?;

    // file:///C:/x arrives as "/C:/x"
    if path.len() >= 3 && path.starts_with('/') && is_drive_path(&path[1..]) {
        path.remove(0);
    }

    // file://server/share/x is a UNC path
    if let Some(host) = url.host_str().filter(|h| !h.is_empty() && *h != "localhost") {
        path = format!("//{}{}", host, path);
    }

    if path.is_empty() {
        return Err(LocationError::InvalidUri(raw.to_string()));
    }

    Ok(PathBuf::from(native_separators(&path)))
}

fn percent_decode(s: &str) -> Result<String, LocationError> {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .map_err(|_| LocationError::InvalidUri(s.to_string()))
}

/// `C:\...` or `C:/...`
fn is_drive_path(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

fn native_separators(s: &str) -> String {
    if cfg!(windows) {
        s.replace('/', "\\")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PathBuf {
        PathBuf::from("/playlists")
    }

    fn native(s: &str) -> PathBuf {
        PathBuf::from(native_separators(s))
    }

    #[test]
    fn test_empty_location() {
        assert_eq!(resolve_location("   ", &base()), Err(LocationError::Empty));
    }

    #[test]
    fn test_file_uri_percent_decoded() {
        let path = resolve_location("file:///home/me/My%20Music/track%231.mp3", &base()).unwrap();
        assert_eq!(path, native("/home/me/My Music/track#1.mp3"));
    }

    #[test]
    fn test_file_uri_with_drive_letter() {
        let path = resolve_location("file:///C:/Users/me/song.mp3", &base()).unwrap();
        assert_eq!(path, native("C:/Users/me/song.mp3"));
    }

    #[test]
    fn test_bare_drive_path_kept() {
        let path = resolve_location(r"D:\Videos\clip.mp4", &base()).unwrap();
        assert_eq!(path, PathBuf::from(r"D:\Videos\clip.mp4"));
        assert!(is_drive_path("d:/x"));
        assert!(!is_drive_path("file:///x"));
    }

    #[test]
    fn test_unc_host() {
        let path = resolve_location("file://nas/share/song.flac", &base()).unwrap();
        assert_eq!(path, native("//nas/share/song.flac"));
    }

    #[test]
    fn test_remote_location_rejected() {
        assert_eq!(
            resolve_location("https://example.com/stream.mp3", &base()),
            Err(LocationError::Remote("https".to_string()))
        );
    }

    #[test]
    fn test_colon_in_relative_name() {
        let path = resolve_location("Artist: Song.mp3", &base()).unwrap();
        assert_eq!(path, base().join("Artist: Song.mp3"));
    }

    #[test]
    fn test_relative_location_joined_to_playlist_dir() {
        let path = resolve_location("media/Intro%20Theme.ogg", &base()).unwrap();
        assert_eq!(path, base().join(native("media/Intro Theme.ogg")));
    }
}
