//! Retry and timeout policy for generation calls

use std::time::Duration;

/// Exponential backoff with a per-attempt timeout
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first, at least 1
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
    /// Upper bound of the random delay added to each backoff
    pub jitter: Duration,
    /// Wall-clock limit for a single attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
            jitter: Duration::from_millis(250),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Same attempt count and timeout, no waiting between attempts
    pub fn immediate() -> Self {
        Self {
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Backoff before attempt `failed_attempts + 1`, without jitter
    ///
    /// A rate-limit hint replaces the computed backoff when it is longer; the result never
    /// exceeds `max_backoff`.
    pub fn backoff(&self, failed_attempts: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = failed_attempts.saturating_sub(1) as i32;
        let computed = self.initial_backoff.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        let computed = Duration::from_secs_f64(computed.min(self.max_backoff.as_secs_f64()));

        let wanted = match retry_after {
            Some(hint) if hint > computed => hint,
            _ => computed,
        };
        wanted.min(self.max_backoff)
    }

    /// Backoff plus random jitter
    pub fn delay(&self, failed_attempts: u32, retry_after: Option<Duration>) -> Duration {
        let base = self.backoff(failed_attempts, retry_after);
        if base.is_zero() || self.jitter.is_zero() {
            return base;
        }
        let jitter_ms = self.jitter.as_millis() as u64;
        base + Duration::from_millis(rand::random_range(0..=jitter_ms))
    }
}
