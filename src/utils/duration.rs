//! Duration formatting and comparison

use std::time::Duration;

/// Format as `H:MM:SS` or `M:SS`
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Whether two durations differ by at most `tolerance`
pub fn durations_match(expected: Duration, actual: Duration, tolerance: Duration) -> bool {
    expected.abs_diff(actual) <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_short() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_millis(215_900)), "3:35");
    }

    #[test]
    fn test_format_long() {
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 5 * 60 + 9)), "3:05:09");
    }

    #[test]
    fn test_durations_match() {
        let tol = Duration::from_secs(1);
        assert!(durations_match(Duration::from_secs(60), Duration::from_millis(60_800), tol));
        assert!(durations_match(Duration::from_millis(60_800), Duration::from_secs(60), tol));
        assert!(!durations_match(Duration::from_secs(60), Duration::from_secs(62), tol));
    }
}
