//! Formatting utilities for rates and byte counts
//!
//! Decimal (SI) prefixes are used throughout so that summaries line up with the
//! KB/s figures throughput tools print.

const KILO: f64 = 1000.0;

/// Formats a rate in bytes per second with an appropriate unit
///
/// # Examples
///
/// ```
/// use traffic_watcher::collectors::formatting::format_rate;
///
/// assert_eq!(format_rate(0.0), "0.00 B/s");
/// assert_eq!(format_rate(1000.0), "1.00 KB/s");
/// assert_eq!(format_rate(2_500_000.0), "2.50 MB/s");
/// ```
pub fn format_rate(bytes_per_second: f64) -> String {
    let magnitude = bytes_per_second.abs();
    if magnitude < KILO {
        format!("{:.2} B/s", bytes_per_second)
    } else if magnitude < KILO * KILO {
        format!("{:.2} KB/s", bytes_per_second / KILO)
    } else if magnitude < KILO * KILO * KILO {
        format!("{:.2} MB/s", bytes_per_second / (KILO * KILO))
    } else {
        format!("{:.2} GB/s", bytes_per_second / (KILO * KILO * KILO))
    }
}

/// Formats a byte count with an appropriate unit
///
/// # Examples
///
/// ```
/// use traffic_watcher::collectors::formatting::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(6_250_000), "6.25 MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    let value = bytes as f64;
    if value < KILO {
        format!("{} B", bytes)
    } else if value < KILO * KILO {
        format!("{:.2} KB", value / KILO)
    } else if value < KILO * KILO * KILO {
        format!("{:.2} MB", value / (KILO * KILO))
    } else if value < KILO * KILO * KILO * KILO {
        format!("{:.2} GB", value / (KILO * KILO * KILO))
    } else {
        format!("{:.2} TB", value / (KILO * KILO * KILO * KILO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.0), "0.00 B/s");
        assert_eq!(format_rate(999.0), "999.00 B/s");
        assert_eq!(format_rate(1000.0), "1.00 KB/s");
        assert_eq!(format_rate(2000.0), "2.00 KB/s");
        assert_eq!(format_rate(1_500_000.0), "1.50 MB/s");
        assert_eq!(format_rate(3_000_000_000.0), "3.00 GB/s");
    }

    #[test]
    fn test_format_rate_negative_values() {
        // negative_rates mode can report these; the unit follows the magnitude
        assert_eq!(format_rate(-2000.0), "-2.00 KB/s");
        assert_eq!(format_rate(-10.0), "-10.00 B/s");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1000), "1.00 KB");
        assert_eq!(format_bytes(1_500_000), "1.50 MB");
        assert_eq!(format_bytes(2_000_000_000), "2.00 GB");
        assert_eq!(format_bytes(1_000_000_000_000), "1.00 TB");
    }
}
