use std::time::Duration;

use rand::Rng;

/// Largest accepted jitter fraction; keeps the lower bound above zero.
const MAX_FRACTION: f64 = 0.99;

/// Scale `delay` by a random factor in `[1 - fraction, 1 + fraction]`.
pub fn jittered(delay: Duration, fraction: f64) -> Duration {
    jittered_with(&mut rand::thread_rng(), delay, fraction)
}

/// Same as [`jittered`] with a caller-supplied RNG.
pub fn jittered_with<R: Rng + ?Sized>(rng: &mut R, delay: Duration, fraction: f64) -> Duration {
    if delay.is_zero() || !fraction.is_finite() || fraction <= 0.0 {
        return delay;
    }
    let fraction = fraction.min(MAX_FRACTION);
    let factor = rng.gen_range((1.0 - fraction)..=(1.0 + fraction));
    delay.mul_f64(factor)
}
