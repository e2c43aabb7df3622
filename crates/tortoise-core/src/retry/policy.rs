use std::time::Duration;

/// Cap multiplier applied to request pacing backoff (`base * 8`).
pub const PACING_CAP_MULTIPLIER: f64 = 8.0;

/// Default cap multiplier for job retries (60s base, 3600s ceiling).
pub const JOB_CAP_MULTIPLIER: f64 = 60.0;

/// Largest exponent we bother computing; `2^32` already exceeds every sane cap.
const MAX_EXPONENT: u32 = 32;

/// Exponential backoff: `min(base * 2^attempt, base * cap_multiplier)`.
///
/// `attempt` is zero-indexed, so `attempt = 0` yields `base` and the first
/// failure (`attempt = 1`) yields `base * 2`. A `cap_multiplier` below 1 (or
/// not finite) is treated as 1 so the result never drops under `base`.
pub fn delay(attempt: u32, base: Duration, cap_multiplier: f64) -> Duration {
    let cap = if cap_multiplier.is_finite() && cap_multiplier >= 1.0 {
        cap_multiplier
    } else {
        1.0
    };
    let factor = 2f64.powi(attempt.min(MAX_EXPONENT) as i32).min(cap);
    base.mul_f64(factor)
}

/// A backoff parameterisation: a base duration and a cap multiplier.
///
/// The same formula drives two places: per-job retry scheduling
/// (`attempt_count`) and request pacing (`consecutive_failures`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay for attempt 0.
    pub base: Duration,
    /// Upper bound expressed as a multiple of `base`.
    pub cap_multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::job_retry(Duration::from_secs(60), Duration::from_secs(3600))
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap_multiplier: f64) -> Self {
        Self {
            base,
            cap_multiplier,
        }
    }

    /// Job retry backoff from a base and an absolute ceiling.
    pub fn job_retry(base: Duration, ceiling: Duration) -> Self {
        let cap_multiplier = if base.is_zero() {
            1.0
        } else {
            ceiling.as_secs_f64() / base.as_secs_f64()
        };
        Self::new(base, cap_multiplier)
    }

    /// Request pacing backoff: the inter-request interval capped at 8x.
    pub fn pacing(base_interval: Duration) -> Self {
        Self::new(base_interval, PACING_CAP_MULTIPLIER)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        delay(attempt, self.base, self.cap_multiplier)
    }

    /// The largest delay this policy can return.
    pub fn ceiling(&self) -> Duration {
        delay(MAX_EXPONENT, self.base, self.cap_multiplier)
    }
}
