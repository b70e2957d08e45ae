//! Retry policy for transient upstream failures.
//!
//! Retries cover rate limiting (429), the gateway/server family
//! (500, 502, 503, 504), timeouts and refused connections. The wait before
//! retry `n` is `backoff_factor * 2^(n-1)`, capped at `MAX_BACKOFF`, with no
//! jitter so callers see the same schedule every time.
//!
//! Only idempotent requests are retried once they may have reached the
//! server. A POST is retried solely when the connection was never made.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

use crate::config::Settings;
use crate::http::HttpMethod;

pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_retries: settings.max_retries(),
            backoff_factor: settings.retry_delay(),
        }
    }

    pub fn is_retryable_status(status: u16) -> bool {
        RETRY_STATUSES.contains(&status)
    }

    /// Whether a request may be sent again after the server could have seen it.
    pub fn is_idempotent(method: HttpMethod) -> bool {
        match method {
            HttpMethod::Get => true,
            HttpMethod::Post => false,
        }
    }

    /// Delay schedule for one call.
    pub fn schedule(&self) -> RetrySchedule {
        let first = self.backoff_factor.min(MAX_BACKOFF);
        let mut backoff = ExponentialBackoff {
            current_interval: first,
            initial_interval: first,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: MAX_BACKOFF,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        backoff.reset();
        RetrySchedule {
            remaining: self.max_retries,
            backoff,
        }
    }
}

/// Remaining retries and delays for a single call.
pub struct RetrySchedule {
    remaining: u32,
    backoff: ExponentialBackoff,
}

impl RetrySchedule {
    /// Consume one retry and return the wait before it, or `None` once the
    /// budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.backoff.next_backoff().unwrap_or(MAX_BACKOFF))
    }
}
