//! Human-readable formatting helpers.

/// Binary units used for sizes, matching what operators see from `free -h`.
const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

/// Format a byte count with binary units, e.g. `1.5 GiB`.
#[must_use]
pub fn format_binary_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len().saturating_sub(1) {
        value /= 1024.0;
        unit = unit.saturating_add(1);
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Format an uptime in seconds as `N days, HH:MM:SS`.
#[must_use]
pub fn format_uptime(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = total_secs % 86_400 / 3_600;
    let minutes = total_secs % 3_600 / 60;
    let seconds = total_secs % 60;
    if days == 1 {
        format!("1 day, {hours:02}:{minutes:02}:{seconds:02}")
    } else if days > 0 {
        format!("{days} days, {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Render how long ago something happened, e.g. `3 hours ago`.
///
/// Future instants (clock skew between the host and the engine) collapse to
/// `just now`.
#[must_use]
pub fn format_relative(seconds_ago: i64) -> String {
    if seconds_ago < 60 {
        return "just now".to_owned();
    }
    let (amount, unit) = if seconds_ago < 3_600 {
        (seconds_ago / 60, "minute")
    } else if seconds_ago < 86_400 {
        (seconds_ago / 3_600, "hour")
    } else if seconds_ago < 2_592_000 {
        (seconds_ago / 86_400, "day")
    } else if seconds_ago < 31_536_000 {
        (seconds_ago / 2_592_000, "month")
    } else {
        (seconds_ago / 31_536_000, "year")
    };
    if amount == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{amount} {unit}s ago")
    }
}

/// `part` of `whole` as a percentage rounded to two decimals; `0.0` when the
/// whole is zero.
#[must_use]
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 / whole as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}
