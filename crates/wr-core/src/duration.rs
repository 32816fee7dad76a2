//! Duration strings used by the configuration.
//!
//! Debounce windows and command timeouts are written as human-readable strings
//! (`"250ms"`, `"60s"`, `"1m30s"`) and parsed with `humantime`.

use std::time::Duration;

use crate::error::ConfigError;

/// Timeout applied to a command that has no timeout, or an unparsable one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Parses a duration string such as `"250ms"`, `"60s"` or `"1m30s"`.
///
/// `field` names the configuration option for the error message.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wr_core::parse_duration;
///
/// assert_eq!(parse_duration("debounce", "250ms").ok(), Some(Duration::from_millis(250)));
/// assert_eq!(parse_duration("timeout", "1m30s").ok(), Some(Duration::from_secs(90)));
/// assert!(parse_duration("timeout", "soon").is_err());
/// ```
pub fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidDuration {
        option: field.to_owned(),
        value: value.to_owned(),
        reason: e.to_string(),
    })
}

/// Formats a duration for log lines: milliseconds below one second, otherwise
/// seconds with two decimals.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wr_core::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
