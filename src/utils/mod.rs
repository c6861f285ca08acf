//! Small formatting helpers shared by match reasons and activity messages.

const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Format a byte count for display: "23B", "450KB", "1.2MB".
///
/// Kilobytes are rounded to whole numbers; larger units keep one decimal.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{}B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{:.0}{}", value, UNITS[unit])
    } else {
        format!("{:.1}{}", value, UNITS[unit])
    }
}

/// Percentage with no decimals, for confidence values in `[0, 1]`
pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio.clamp(0.0, 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0B");
        assert_eq!(format_size(1023), "1023B");
        assert_eq!(format_size(1536), "2KB");
        assert_eq!(format_size(1_363_149), "1.3MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0GB");
        assert_eq!(format_size(2048 * 1024 * 1024 * 1024), "2048.0TB");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.874), "87%");
        assert_eq!(format_percent(1.4), "100%");
    }
}
