//! GitHub rate-limit headers
//!
//! The gateway never retries; it only tells the caller how long to wait.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Rate-limit state reported by GitHub on a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimit {
    /// Requests left in the current window, if the header was present
    pub remaining: Option<u64>,
    /// When the window resets, if the header was present and parsable
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let remaining = header_value(headers, REMAINING_HEADER).and_then(|v| v.parse().ok());
        let reset = header_value(headers, RESET_HEADER)
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Self { remaining, reset }
    }

    /// Whether quota is left, i.e. a 403 is an authorization failure
    pub fn has_quota(&self) -> bool {
        self.remaining.is_some_and(|remaining| remaining > 0)
    }

    /// Caller-facing message, relative to the current time
    pub fn message(&self) -> String {
        self.message_at(Utc::now())
    }

    pub fn message_at(&self, now: DateTime<Utc>) -> String {
        match self.reset {
            Some(reset) => format!(
                "Exceeded rate limit. Try again in {}",
                format_duration(round_to_seconds(reset - now))
            ),
            None => "Exceeded rate limit. Try again later".to_string(),
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

/// Round half away from zero
fn round_to_seconds(delta: chrono::Duration) -> i64 {
    let millis = delta.num_milliseconds();
    if millis >= 0 {
        (millis + 500) / 1000
    } else {
        -((-millis + 500) / 1000)
    }
}

/// Render whole seconds as `1h2m3s`, `4m0s`, `59s`, `0s`
fn format_duration(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();
    let (hours, minutes, secs) = (total / 3600, total % 3600 / 60, total % 60);

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{secs}s")
    } else {
        format!("{sign}{secs}s")
    }
}
