/// Utility functions for timing and formatting
use time::macros::format_description;
use time::OffsetDateTime;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Convert a time::Duration to whole seconds, clamping negative spans to zero
pub fn duration_to_seconds(duration: time::Duration) -> u64 {
    duration.whole_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_day_first() {
        let dt = datetime!(2024-03-07 08:05:09 UTC);
        assert_eq!(format_datetime(&dt), "07.03.2024 - 08:05:09");
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        assert_eq!(duration_to_seconds(time::Duration::seconds(42)), 42);
        assert_eq!(duration_to_seconds(time::Duration::milliseconds(1999)), 1);
        assert_eq!(duration_to_seconds(time::Duration::seconds(-5)), 0);
    }
}
