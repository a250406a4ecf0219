//! Rate limiting for payload emission

use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota};
use tokio_util::sync::CancellationToken;

/// Longest accepted spacing between tokens
///
/// Slower rates are clamped here so the limiter's nanosecond clock arithmetic
/// cannot overflow.
pub const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Shortest spacing between tokens; faster rates are clamped to it
pub const MIN_PERIOD: Duration = Duration::from_nanos(1);

/// Returned when a throttle wait is interrupted by the abort token
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limiter wait cancelled")]
pub struct Cancelled;

/// Token bucket limiter with capacity one, via the governor crate
///
/// One instance per worker. The bucket starts drained so that emissions are
/// spaced by `1 / rate` from the very first one; there is never more than one
/// token pending.
pub struct RateLimiter {
    limiter: Option<DefaultDirectRateLimiter>,
    rate: f64,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `rate` - Tokens per second; fractional rates are allowed. Zero,
    ///   negative or non-finite values disable rate limiting. Any other rate
    ///   is honoured with its period clamped to [`MIN_PERIOD`, `MAX_PERIOD`].
    ///
    /// # Examples
    /// ```
    /// use telemetrygen_core::worker::RateLimiter;
    ///
    /// // One token every 100ms
    /// let limiter = RateLimiter::new(10.0);
    /// assert!(limiter.is_enabled());
    ///
    /// // Unlimited
    /// let unlimited = RateLimiter::new(0.0);
    /// assert!(!unlimited.is_enabled());
    /// ```
    pub fn new(rate: f64) -> Self {
        let limiter = (rate.is_finite() && rate > 0.0)
            .then(|| period_for(rate))
            .and_then(Quota::with_period)
            .map(|quota| {
                let limiter = governor::RateLimiter::direct(quota);
                // Drain the initial token
                let _ = limiter.check();
                limiter
            });

        Self { limiter, rate }
    }

    /// Create an unlimited rate limiter
    pub fn unlimited() -> Self {
        Self::new(0.0)
    }

    /// Wait until one token is available
    ///
    /// Returns without waiting if no rate is configured. The wait itself is
    /// interrupted only by `abort`; the soft stop signal is never observed here.
    pub async fn acquire(&self, abort: &CancellationToken) -> Result<(), Cancelled> {
        let Some(limiter) = &self.limiter else {
            // An unlimited loop must still let the watchdog and siblings run
            tokio::task::yield_now().await;
            return Ok(());
        };

        tokio::select! {
            biased;

            _ = abort.cancelled() => Err(Cancelled),
            _ = limiter.until_ready() => Ok(()),
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Get the configured rate (tokens per second)
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

fn period_for(rate: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / rate)
        .unwrap_or(MAX_PERIOD)
        .clamp(MIN_PERIOD, MAX_PERIOD)
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("rate", &self.rate)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
