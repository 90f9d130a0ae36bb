//! Retry delay policy between a failed request and the following probe.

use std::time::Duration;

use rand::Rng;

/// Fraction of the base delay added or removed at random.
const JITTER: f64 = 0.25;

/// Exponential backoff with jitter.
///
/// Retries are unbounded; this only spaces them out.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry. Zero disables backoff.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(15),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Retries immediately, without sleeping.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    /// Delay before retry `attempt` (1-based) without jitter:
    /// `initial_delay * backoff_factor^(attempt - 1)`, capped at `max_delay`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = scaled.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }

    /// [`base_delay`](Self::base_delay) spread by up to ±25%. Always zero
    /// when `initial_delay` is zero.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if base.is_zero() {
            return Duration::ZERO;
        }
        let spread = rand::thread_rng().gen_range(-JITTER..=JITTER);
        base.mul_f64(1.0 + spread)
    }
}
