//! Common formatting helpers used in log lines and summaries.
//!
//! - [`format_count`] - Format counts with K/M suffix (1.5K, 2.3M)
//! - [`format_bytes`] - Format byte sizes (KB, MB, GB)
//! - [`format_age`] - Format a cache age (2h 05m, 45m 10s)

use chrono::TimeDelta;

/// Format a count with K/M suffix for compact display.
///
/// # Examples
/// ```
/// use nft_prefix_import::utils::format_count;
/// assert_eq!(format_count(500), "500");
/// assert_eq!(format_count(1500), "1.5K");
/// assert_eq!(format_count(1_500_000), "1.5M");
/// ```
pub fn format_count(count: usize) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Format bytes in human-readable form (KB, MB, GB).
///
/// # Examples
/// ```
/// use nft_prefix_import::utils::format_bytes;
/// assert_eq!(format_bytes(1024), "1.0 KB");
/// assert_eq!(format_bytes(1_500_000), "1.4 MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format an age for log output.
///
/// Negative ages (file modified "in the future") are shown as `0s`.
///
/// # Examples
/// ```
/// use chrono::TimeDelta;
/// use nft_prefix_import::utils::format_age;
/// assert_eq!(format_age(TimeDelta::minutes(125)), "2h 05m");
/// assert_eq!(format_age(TimeDelta::seconds(42)), "42s");
/// ```
pub fn format_age(age: TimeDelta) -> String {
    let secs = age.num_seconds().max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1.0K");
        assert_eq!(format_count(1500), "1.5K");
        assert_eq!(format_count(999_999), "1000.0K");
        assert_eq!(format_count(1_000_000), "1.0M");
        assert_eq!(format_count(1_250_000), "1.2M");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1_500_000), "1.4 MB");
        assert_eq!(format_bytes(1_500_000_000), "1.4 GB");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(TimeDelta::zero()), "0s");
        assert_eq!(format_age(TimeDelta::seconds(59)), "59s");
        assert_eq!(format_age(TimeDelta::seconds(61)), "1m 01s");
        assert_eq!(format_age(TimeDelta::hours(3)), "3h 00m");
        assert_eq!(format_age(TimeDelta::minutes(90)), "1h 30m");
    }

    #[test]
    fn test_format_age_negative_is_zero() {
        assert_eq!(format_age(TimeDelta::minutes(-5)), "0s");
    }
}
