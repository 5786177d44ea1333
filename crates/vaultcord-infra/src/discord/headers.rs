//! Extraction of Discord rate limit headers.
//!
//! Discord reports per-route quota on every response:
//! - `X-RateLimit-Limit`: requests allowed in the window
//! - `X-RateLimit-Remaining`: requests left in the window
//! - `X-RateLimit-Reset`: epoch seconds (fractional) when the window resets
//! - `X-RateLimit-Reset-After`: seconds (fractional) until the window resets
//! - `X-RateLimit-Bucket`: opaque id shared by routes with the same quota
//!
//! `Reset-After` is preferred because it does not depend on clock skew
//! between Discord and this host.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

use vaultcord_core::Clock;

const LIMIT: &str = "x-ratelimit-limit";
const REMAINING: &str = "x-ratelimit-remaining";
const RESET: &str = "x-ratelimit-reset";
const RESET_AFTER: &str = "x-ratelimit-reset-after";
const BUCKET: &str = "x-ratelimit-bucket";

/// Quota values read from one Discord response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub remaining: u32,
    pub limit: u32,
    /// Epoch milliseconds when the window resets.
    pub reset_at: i64,
    pub bucket: Option<String>,
}

impl RateLimitHeaders {
    /// Parse the quota headers. Returns `None` when `remaining` or both reset
    /// headers are missing or malformed, leaving the endpoint unrestricted.
    pub fn from_headers(headers: &HeaderMap, clock: &Clock) -> Option<Self> {
        let remaining = parse_header::<u32>(headers, REMAINING)?;

        let reset_at = parse_header::<f64>(headers, RESET_AFTER)
            .and_then(seconds_to_duration)
            .map(|after| clock.millis_after(after))
            .or_else(|| {
                parse_header::<f64>(headers, RESET)
                    .filter(|secs| secs.is_finite() && *secs >= 0.0)
                    .map(|secs| (secs * 1000.0).round() as i64)
            })?;

        let limit = parse_header::<u32>(headers, LIMIT).unwrap_or(remaining);
        let bucket = headers
            .get(BUCKET)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Some(Self {
            remaining,
            limit,
            reset_at,
            bucket,
        })
    }
}

/// `Retry-After` of a 429 response, in (possibly fractional) seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    parse_header::<f64>(headers, RETRY_AFTER.as_str()).and_then(seconds_to_duration)
}

/// `retry_after` field of a 429 JSON body.
pub fn retry_after_from_body(body: &serde_json::Value) -> Option<Duration> {
    body.get("retry_after")
        .and_then(serde_json::Value::as_f64)
        .and_then(seconds_to_duration)
}

fn parse_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn seconds_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_after_is_preferred() {
        let clock = Clock::at(10_000);
        let parsed = RateLimitHeaders::from_headers(
            &headers(&[
                ("x-ratelimit-limit", "5"),
                ("x-ratelimit-remaining", "0"),
                ("x-ratelimit-reset", "99999.0"),
                ("x-ratelimit-reset-after", "1.25"),
                ("x-ratelimit-bucket", "abcd1234"),
            ]),
            &clock,
        )
        .unwrap();

        assert_eq!(
            parsed,
            RateLimitHeaders {
                remaining: 0,
                limit: 5,
                reset_at: 11_250,
                bucket: Some("abcd1234".to_string()),
            }
        );
    }

    #[test]
    fn test_absolute_reset_fallback() {
        let clock = Clock::at(0);
        let parsed = RateLimitHeaders::from_headers(
            &headers(&[
                ("x-ratelimit-remaining", "4"),
                ("x-ratelimit-reset", "1470173023.123"),
            ]),
            &clock,
        )
        .unwrap();

        assert_eq!(parsed.reset_at, 1_470_173_023_123);
        assert_eq!(parsed.limit, 4);
        assert_eq!(parsed.bucket, None);
    }

    #[test]
    fn test_missing_headers_mean_unknown() {
        let clock = Clock::at(0);
        assert_eq!(RateLimitHeaders::from_headers(&HeaderMap::new(), &clock), None);
        assert_eq!(
            RateLimitHeaders::from_headers(&headers(&[("x-ratelimit-remaining", "3")]), &clock),
            None
        );
        assert_eq!(
            RateLimitHeaders::from_headers(
                &headers(&[
                    ("x-ratelimit-remaining", "lots"),
                    ("x-ratelimit-reset-after", "1"),
                ]),
                &clock
            ),
            None
        );
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(
            retry_after(&headers(&[("retry-after", "2.5")])),
            Some(Duration::from_millis(2_500))
        );
        assert_eq!(retry_after(&headers(&[("retry-after", "-1")])), None);

        let body = serde_json::json!({ "message": "You are being rate limited.", "retry_after": 0.5, "global": false });
        assert_eq!(retry_after_from_body(&body), Some(Duration::from_millis(500)));
    }
}
