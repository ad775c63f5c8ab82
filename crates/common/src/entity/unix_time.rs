use chrono::{DateTime, SubsecRound, TimeZone, Utc};

/// Format a timestamp for the `Unix-Time` tag
///
/// Whole seconds since epoch, sub-second part truncated toward zero.
pub fn format_unix_time(timestamp: &DateTime<Utc>) -> String {
    let mut secs = timestamp.timestamp();
    if secs < 0 && timestamp.timestamp_subsec_nanos() > 0 {
        secs += 1;
    }
    secs.to_string()
}

/// Parse a `Unix-Time` tag value
///
/// Leading integer digits are taken and any fractional part is dropped.
/// Returns `None` for anything that is not a number.
pub fn parse_unix_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let integral = match value.split_once('.') {
        Some((integral, fraction)) if fraction.chars().all(|c| c.is_ascii_digit()) => integral,
        Some(_) => return None,
        None => value,
    };
    let secs = integral.parse::<i64>().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

/// The current wall-clock time truncated to whole seconds
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
