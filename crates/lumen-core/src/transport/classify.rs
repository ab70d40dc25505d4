//! Response classification for the retry policy.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::RawResponse;

/// Classified upstream response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// 2xx.
    Success,
    /// 401; the cached token may be stale.
    AuthStale,
    /// 429, with the server-directed delay when one was sent.
    RateLimited {
        /// Parsed `Retry-After` value.
        retry_after: Option<Duration>,
    },
    /// 408, 502, 503, 504.
    Transient,
    /// Other 4xx.
    ClientError,
    /// Other 5xx.
    ServerError,
}

impl Outcome {
    /// True when the retry policy may re-attempt this outcome.
    /// `AuthStale` is handled separately (one invalidate-and-retry per
    /// invocation).
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::RateLimited { .. })
    }
}

/// Classifies an upstream response by status, parsing `Retry-After` for
/// rate-limited responses.
#[must_use]
pub fn classify(response: &RawResponse) -> Outcome {
    match response.status {
        200..=299 => Outcome::Success,
        401 => Outcome::AuthStale,
        429 => Outcome::RateLimited {
            retry_after: response
                .header("retry-after")
                .and_then(|value| parse_retry_after(value, Utc::now())),
        },
        408 | 502 | 503 | 504 => Outcome::Transient,
        400..=499 => Outcome::ClientError,
        _ => Outcome::ServerError,
    }
}

/// Parses a `Retry-After` header value: either delay-seconds or an
/// RFC 7231 HTTP-date. Returns `None` when unparsable so the caller falls
/// back to exponential backoff; dates in the past collapse to zero.
#[must_use]
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
