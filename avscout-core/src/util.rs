/// Format a byte count with fractional KB/MB/GB (e.g., "1.5 KB", "2.3 GB").
pub fn format_bytes_approx(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Parse a human size such as `"232MiB"`, `"1.5 GB"` or `"4096"` into bytes.
///
/// Units are binary (`KB` and `KiB` both mean 1024). Returns `None` for anything else.
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: f64 = number.parse().ok()?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        _ => return None,
    };

    (value >= 0.0).then(|| (value * multiplier as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_approx_picks_largest_unit() {
        assert_eq!(format_bytes_approx(512), "512 B");
        assert_eq!(format_bytes_approx(1536), "1.5 KB");
        assert_eq!(format_bytes_approx(232 * 1024 * 1024), "232.0 MB");
        assert_eq!(format_bytes_approx(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn parse_size_units() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("232MiB"), Some(232 * 1024 * 1024));
        assert_eq!(parse_size("1.5 kb"), Some(1536));
        assert_eq!(parse_size("2G"), Some(2 * 1024 * 1024 * 1024));
    }

    #[test]
    fn parse_size_rejects_garbage() {
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("12 parsecs"), None);
        assert_eq!(parse_size("MB"), None);
    }
}
