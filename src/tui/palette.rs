//! RTT color classification for the heatmap.

use ratatui::style::Color;

/// RTT thresholds in milliseconds.
pub const THRESHOLD_EXCELLENT_MS: f64 = 30.0;
pub const THRESHOLD_GOOD_MS: f64 = 80.0;
pub const THRESHOLD_FAIR_MS: f64 = 150.0;
pub const THRESHOLD_POOR_MS: f64 = 300.0;

/// Colors for each RTT range.
pub const COLOR_EXCELLENT: Color = Color::Rgb(0x00, 0xFF, 0x00);
pub const COLOR_GOOD: Color = Color::Rgb(0x7F, 0xFF, 0x00);
pub const COLOR_FAIR: Color = Color::Rgb(0xFF, 0xFF, 0x00);
pub const COLOR_POOR: Color = Color::Rgb(0xFF, 0x8C, 0x00);
pub const COLOR_BAD: Color = Color::Rgb(0xFF, 0x00, 0x00);
/// Dark magenta: stands out without breaking the heatmap's flow.
pub const COLOR_TIMEOUT: Color = Color::Rgb(0x8B, 0x00, 0x8B);

/// Heatmap cell character; a filled block keeps the grid visually even.
pub const HEATMAP_CELL: &str = "█";

/// Classify an RTT in milliseconds; negative values mean timeout.
pub fn classify_ms(ms: f64) -> Color {
    if ms < 0.0 {
        COLOR_TIMEOUT
    } else if ms <= THRESHOLD_EXCELLENT_MS {
        COLOR_EXCELLENT
    } else if ms <= THRESHOLD_GOOD_MS {
        COLOR_GOOD
    } else if ms <= THRESHOLD_FAIR_MS {
        COLOR_FAIR
    } else if ms <= THRESHOLD_POOR_MS {
        COLOR_POOR
    } else {
        COLOR_BAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_upper_bounds() {
        assert_eq!(classify_ms(0.0), COLOR_EXCELLENT);
        assert_eq!(classify_ms(30.0), COLOR_EXCELLENT);
        assert_eq!(classify_ms(30.1), COLOR_GOOD);
        assert_eq!(classify_ms(80.0), COLOR_GOOD);
        assert_eq!(classify_ms(150.0), COLOR_FAIR);
        assert_eq!(classify_ms(300.0), COLOR_POOR);
        assert_eq!(classify_ms(300.1), COLOR_BAD);
    }

    #[test]
    fn negative_rtt_is_a_timeout() {
        assert_eq!(classify_ms(-1.0), COLOR_TIMEOUT);
    }
}
