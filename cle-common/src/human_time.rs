//! Human-readable time formatting
//!
//! Progress displays show elapsed and remaining time as a stopwatch:
//! `M:SS` below one hour, `H:MM:SS` from one hour on.

const SECONDS_PER_HOUR: u64 = 3600;

/// Format whole seconds as a stopwatch string.
///
/// # Examples
///
/// ```
/// use cle_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0), "0:00");
/// assert_eq!(format_clock(75), "1:15");
/// assert_eq!(format_clock(3725), "1:02:05");
/// ```
pub fn format_clock(seconds: u64) -> String {
    let hours = seconds / SECONDS_PER_HOUR;
    let mins = (seconds % SECONDS_PER_HOUR) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format an estimate as `~M:SS left`, or `finishing…` once it runs out
///
/// Estimates are heuristic; once the budget is spent the remaining time is
/// unknown rather than zero.
pub fn format_remaining(seconds: u64) -> String {
    if seconds == 0 {
        "finishing…".to_string()
    } else {
        format!("~{} left", format_clock(seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_seconds_below_a_minute() {
        assert_eq!(format_clock(5), "0:05");
        assert_eq!(format_clock(59), "0:59");
    }

    #[test]
    fn rolls_over_to_minutes_and_hours() {
        assert_eq!(format_clock(60), "1:00");
        assert_eq!(format_clock(3599), "59:59");
        assert_eq!(format_clock(3600), "1:00:00");
    }

    #[test]
    fn remaining_has_a_floor_message() {
        assert_eq!(format_remaining(0), "finishing…");
        assert_eq!(format_remaining(42), "~0:42 left");
    }
}
