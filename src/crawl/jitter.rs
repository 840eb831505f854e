//! Inter-request jitter
//!
//! Workers sleep a randomized delay between fetches so they drift out of
//! phase with each other and spread load on the target site. Delays are
//! drawn from a half-normal distribution whose mean is the configured
//! average, clipped below at the configured minimum.

use rand::Rng;
use std::time::Duration;

/// Half-normal delay sampler
#[derive(Debug, Clone, Copy)]
pub struct JitterDelay {
    avg_seconds: f64,
    min_seconds: f64,
}

impl JitterDelay {
    pub fn new(avg_seconds: f64, min_seconds: f64) -> Self {
        Self {
            avg_seconds: avg_seconds.max(0.0),
            min_seconds: min_seconds.max(0.0),
        }
    }

    /// Draws the next delay
    pub fn sample(&self) -> Duration {
        let mut rng = rand::rng();
        self.sample_with(&mut rng)
    }

    fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.avg_seconds <= 0.0 {
            return Duration::from_secs_f64(self.min_seconds);
        }

        // |N(0, sigma)| has mean sigma * sqrt(2/pi); pick sigma so the
        // half-normal's mean lands on the configured average.
        let sigma = self.avg_seconds * (std::f64::consts::PI / 2.0).sqrt();

        // Box-Muller transform
        let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = rng.random();
        let normal = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();

        let seconds = (normal.abs() * sigma).max(self.min_seconds);
        Duration::from_secs_f64(seconds)
    }
}
