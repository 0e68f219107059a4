//! `Retry-After` header parsing.
//!
//! ## Rules
//! 1. absent → [`DEFAULT_RETRY_AFTER`]
//! 2. number of seconds → `seconds × 1000 ms`, capped at [`MAX_RETRY_AFTER`]
//! 3. HTTP date → time left until that date; already past → default, else capped
//! 4. anything else (including negative numbers) → default

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Name of the header.
pub const RETRY_AFTER_HEADER: &str = "Retry-After";

/// Delay used when the header is absent or unusable.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_millis(1000);

/// Upper bound of any header-derived delay.
pub const MAX_RETRY_AFTER: Duration = Duration::from_millis(10_000);

/// Delay requested by a `Retry-After` header, relative to the current time.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use retryvisor::http::retry_after_delay;
///
/// assert_eq!(retry_after_delay(Some("2")), Duration::from_secs(2));
/// assert_eq!(retry_after_delay(Some("120")), Duration::from_secs(10));
/// assert_eq!(retry_after_delay(None), Duration::from_secs(1));
/// ```
pub fn retry_after_delay(header: Option<&str>) -> Duration {
    retry_after_delay_at(header, Utc::now())
}

/// Same as [`retry_after_delay`] with an explicit clock.
pub fn retry_after_delay_at(header: Option<&str>, now: DateTime<Utc>) -> Duration {
    let Some(raw) = header.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_RETRY_AFTER;
    };

    if let Ok(secs) = raw.parse::<f64>() {
        if !secs.is_finite() || secs < 0.0 {
            return DEFAULT_RETRY_AFTER;
        }
        let ms = (secs * 1000.0).min(MAX_RETRY_AFTER.as_millis() as f64);
        return Duration::from_secs_f64(ms / 1000.0);
    }

    match parse_date(raw) {
        Some(at) => match (at - now).to_std() {
            Ok(left) => left.min(MAX_RETRY_AFTER),
            Err(_) => DEFAULT_RETRY_AFTER,
        },
        None => DEFAULT_RETRY_AFTER,
    }
}

/// IMF-fixdate / RFC 2822 first, RFC 3339 as a fallback.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
