//! Concat demuxer list file

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Render the concat demuxer list for segments, in order
///
/// The demuxer wants forward slashes and single-quoted paths; a literal `'`
/// is written as `'\''`.
pub fn concat_list(parts: &[PathBuf]) -> String {
    let mut content = String::new();
    for part in parts {
        let mut path = part.to_string_lossy().into_owned();
        if cfg!(windows) {
            path = path.replace('\\', "/");
        }
        content.push_str(&format!("file '{}'\n", path.replace('\'', r"'\''")));
    }
    content
}

/// Write the list file and return its path
pub async fn write_concat_list(list_path: &Path, parts: &[PathBuf]) -> Result<PathBuf> {
    fs::write(list_path, concat_list(parts))
        .await
        .with_context(|| format!("Failed to write concat list {}", list_path.display()))?;

    debug!(
        "Wrote concat list: {} ({} segments)",
        list_path.display(),
        parts.len()
    );
    Ok(list_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_empty() {
        assert_eq!(concat_list(&[]), "");
    }

    #[test]
    fn test_concat_list_preserves_order() {
        let parts = vec![
            PathBuf::from("/out/work/part_003.mp4"),
            PathBuf::from("/out/work/part_001.mp4"),
        ];
        assert_eq!(
            concat_list(&parts),
            "file '/out/work/part_003.mp4'\nfile '/out/work/part_001.mp4'\n"
        );
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let parts = vec![PathBuf::from("/out/Rock 'n' Roll_work/part_001.mp4")];
        assert_eq!(
            concat_list(&parts),
            "file '/out/Rock '\\''n'\\'' Roll_work/part_001.mp4'\n"
        );
    }

    #[cfg(windows)]
    #[test]
    fn test_concat_list_forward_slashes() {
        let parts = vec![PathBuf::from(r"C:\out\mix_work\part_001.mp4")];
        assert_eq!(concat_list(&parts), "file 'C:/out/mix_work/part_001.mp4'\n");
    }

    #[tokio::test]
    async fn test_write_concat_list() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("concat.txt");
        let parts = vec![dir.path().join("part_001.mp4")];

        let written = write_concat_list(&list, &parts).await.unwrap();
        assert_eq!(written, list);

        let content = std::fs::read_to_string(&list).unwrap();
        assert!(content.starts_with("file '"));
        assert!(content.ends_with("part_001.mp4'\n"));
    }
}
