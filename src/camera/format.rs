//! High frame rate format selection.

use super::types::DeviceFormat;

/// Frame rate a movie session asks for when nothing else is configured.
pub const DEFAULT_MIN_FRAME_RATE: f64 = 120.0;

/// Pick the format to activate for high frame rate recording.
///
/// Every format whose maximum frame rate reaches `min_frame_rate` qualifies.
/// The scan runs over the whole list and the last qualifying format wins,
/// so `[30, 120, 240, 60]` with a threshold of 120 selects the 240 fps format.
pub fn select_high_frame_rate_format(
    formats: &[DeviceFormat],
    min_frame_rate: f64,
) -> Option<&DeviceFormat> {
    let mut selected = None;
    for format in formats {
        if format.max_frame_rate >= min_frame_rate {
            selected = Some(format);
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats(rates: &[f64]) -> Vec<DeviceFormat> {
        rates
            .iter()
            .enumerate()
            .map(|(i, &rate)| DeviceFormat::new(1280 + i as u32, 720, rate))
            .collect()
    }

    #[test]
    fn test_last_qualifying_format_wins() {
        let formats = formats(&[30.0, 120.0, 240.0, 60.0]);
        let selected = select_high_frame_rate_format(&formats, 120.0).unwrap();
        assert_eq!(selected.max_frame_rate, 240.0);
        assert_eq!(selected, &formats[2]);
    }

    #[test]
    fn test_later_equal_rate_beats_earlier() {
        let formats = formats(&[240.0, 30.0, 120.0]);
        let selected = select_high_frame_rate_format(&formats, 120.0).unwrap();
        assert_eq!(selected, &formats[2]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let formats = formats(&[60.0, 120.0]);
        let selected = select_high_frame_rate_format(&formats, 120.0).unwrap();
        assert_eq!(selected.max_frame_rate, 120.0);
    }

    #[test]
    fn test_no_qualifying_format() {
        let formats = formats(&[30.0, 60.0]);
        assert!(select_high_frame_rate_format(&formats, 120.0).is_none());
        assert!(select_high_frame_rate_format(&[], 120.0).is_none());
    }
}
