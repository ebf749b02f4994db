//! Pure string formatting helpers shared by the stat collectors.

/// Target width for throughput values so the bar does not jitter
/// as the number of digits changes.
const ADJUSTED_WIDTH: usize = 6;

/// Left-trim whitespace, then right-pad with spaces up to `width`.
pub fn adjust_string_width(s: &str, width: usize) -> String {
    let mut s = s.trim_start_matches(' ').to_string();
    while s.len() < width {
        s.push(' ');
    }
    s
}

/// Convert a byte count to the largest unit with a value >= 1,
/// padded to a fixed width.
#[inline]
pub fn format_bytes(bytes: u64) -> String {
    let kb = bytes as f32 / 1000.0;
    if kb < 1.0 {
        return adjust_string_width(&format!("{bytes:4}B"), ADJUSTED_WIDTH);
    }
    let mb = kb / 1000.0;
    if mb < 1.0 {
        return adjust_string_width(&format!("{kb:4.1}K"), ADJUSTED_WIDTH);
    }
    let gb = mb / 1000.0;
    if gb < 1.0 {
        return adjust_string_width(&format!("{mb:4.1}M"), ADJUSTED_WIDTH);
    }
    let tb = gb / 1000.0;
    if tb < 1.0 {
        return adjust_string_width(&format!("{gb:4.1}G"), ADJUSTED_WIDTH);
    }
    adjust_string_width(&format!("{tb:4.1}T"), ADJUSTED_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_string_width_pads_right() {
        assert_eq!(adjust_string_width("  42B", 6), "42B   ");
    }

    #[test]
    fn test_adjust_string_width_keeps_long_strings() {
        assert_eq!(adjust_string_width("1234567", 6), "1234567");
    }

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(0), "0B    ");
        assert_eq!(format_bytes(999), "999B  ");
        assert_eq!(format_bytes(1500), "1.5K  ");
        assert_eq!(format_bytes(2_500_000), "2.5M  ");
        assert_eq!(format_bytes(3_200_000_000), "3.2G  ");
    }
}
