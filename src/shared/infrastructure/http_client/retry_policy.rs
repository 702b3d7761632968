//! Retry policies for the external HTTP services
//!
//! Detection gateways and object stores throttle differently; each gets its
//! own policy and the client consults it between attempts.

use reqwest::header::HeaderMap;
use std::time::Duration;

/// Configuration for HTTP retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Upper bound for any single wait
    pub max_delay: Duration,
    pub exponential_backoff: bool,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Detection calls are expensive and metered; back off patiently
    pub fn vision() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_backoff: true,
            backoff_multiplier: 2.0,
        }
    }

    /// Object store writes are cheap to retry quickly
    pub fn storage() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            exponential_backoff: true,
            backoff_multiplier: 2.0,
        }
    }

    /// Single attempt, used by tests and one-shot requests
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            exponential_backoff: false,
            backoff_multiplier: 1.0,
        }
    }

    /// Calculate delay for next retry attempt
    pub fn calculate_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(server_delay) = retry_after {
            return server_delay.min(self.max_delay);
        }

        let delay = if self.exponential_backoff {
            let multiplier = self.backoff_multiplier.powi(attempt as i32);
            Duration::from_millis((self.base_delay.as_millis() as f64 * multiplier) as u64)
        } else {
            self.base_delay
        };

        delay.min(self.max_delay)
    }
}

/// Throttling hints carried by a 429 response
#[derive(Debug, Clone, Default)]
pub struct RateLimitInfo {
    /// From `Retry-After`
    pub retry_after: Option<Duration>,
    /// Time left until `X-RateLimit-Reset` (unix seconds)
    pub reset_time: Option<Duration>,
    pub remaining: Option<u32>,
    pub limit: Option<u32>,
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<T>().ok())
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let reset_time = header_number::<u64>(headers, "x-ratelimit-reset").map(|timestamp| {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            Duration::from_secs(timestamp.saturating_sub(now))
        });

        Self {
            retry_after: header_number::<u64>(headers, "retry-after").map(Duration::from_secs),
            reset_time,
            remaining: header_number(headers, "x-ratelimit-remaining"),
            limit: header_number(headers, "x-ratelimit-limit"),
        }
    }

    /// `Retry-After` wins over the reset timestamp
    pub fn recommended_delay(&self) -> Option<Duration> {
        self.retry_after.or(self.reset_time)
    }
}

/// Determines if an error is retryable
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    match error.status() {
        Some(status) => is_retryable_status(status.as_u16()),
        // Network errors are potentially retryable
        None => error.is_timeout() || error.is_connect(),
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500..=599)
}
