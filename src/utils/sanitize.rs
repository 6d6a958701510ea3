//! Filename sanitization utilities

/// Make a playlist title usable as an output file stem
///
/// Characters Windows refuses in file names become `_`, control characters
/// are dropped, and trailing dots/spaces are trimmed because Explorer
/// silently strips them.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    cleaned
        .trim()
        .trim_end_matches(['.', ' '])
        .to_string()
}
