use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Specifies the backoff strategy for retrying failed requests.
#[derive(Clone, Debug)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed(Duration),
    /// Uses an exponential delay between retries.
    /// The delay is calculated as `min(base * (factor ^ failures), max)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
    },
}

impl Backoff {
    /// Delay before the next attempt after `failures` transient failures (0-based).
    pub fn delay(&self, failures: u32) -> Duration {
        match self {
            Backoff::Fixed(d) => *d,
            Backoff::Exponential { base, factor, max } => {
                let exp = i32::try_from(failures).unwrap_or(i32::MAX);
                let secs = base.as_secs_f64() * factor.powi(exp);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    *max
                } else {
                    Duration::from_secs_f64(secs.max(0.0))
                }
            }
        }
    }
}

/// Configuration for the automatic retry mechanism.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Enables or disables the retry mechanism. When disabled exactly one attempt is made.
    pub enabled: bool,
    /// Total number of attempts, including the first one and any rate-limited ones.
    /// `0` is treated as `1`; see [`RetryConfig::attempts`].
    pub max_attempts: u32,
    /// The backoff strategy used after 5xx responses, connection errors and timeouts.
    pub backoff: Backoff,
    /// Upper bound on a single attempt; the in-flight request is dropped when it expires.
    pub attempt_timeout: Duration,
    /// Wait applied after a 429 that carries no usable `Retry-After` header.
    pub default_retry_after: Duration,
    /// Longest `Retry-After` the client is willing to honor.
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(500),
                factor: 2.0,
                max: Duration::from_secs(4),
            },
            attempt_timeout: Duration::from_secs(8),
            default_retry_after: Duration::from_secs(3),
            max_retry_after: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Attempts `send_with_retry` makes at most: `max_attempts` (at least 1), or 1 when disabled.
    pub fn attempts(&self) -> u32 {
        if self.enabled { self.max_attempts.max(1) } else { 1 }
    }

    /// How long to wait after a 429, read from `Retry-After` (delta-seconds).
    pub(crate) fn rate_limit_wait(&self, headers: &HeaderMap) -> Duration {
        parse_retry_after(headers)
            .unwrap_or(self.default_retry_after)
            .min(self.max_retry_after)
    }
}

/// What the executor does after one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Done,
    /// Permanent client error: do not retry.
    Fail,
    /// 429: wait as instructed, without growing the backoff.
    RateLimited,
    /// 5xx: back off and retry.
    Transient,
}

pub(crate) fn classify(status: u16) -> Verdict {
    match status {
        200..=399 => Verdict::Done,
        429 => Verdict::RateLimited,
        400..=499 => Verdict::Fail,
        _ => Verdict::Transient,
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    raw.parse::<u64>().ok().map(Duration::from_secs)
}
