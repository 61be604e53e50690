use std::f64::consts::PI;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Floor applied to every inter-keystroke delay.
pub const MIN_DELAY_MS: f64 = 60.0;

/// Standard deviation of the jitter as a fraction of the mean interval.
pub const DEFAULT_SPREAD_RATIO: f64 = 0.5;

fn nonzero_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.gen();
        if u != 0.0 {
            return u;
        }
    }
}

/// Draw one inter-keystroke delay in milliseconds.
///
/// Samples Normal(`mean_ms`, `spread_ms`) with a Box–Muller transform and clamps
/// the result to [`MIN_DELAY_MS`]. There is no upper bound. Non-finite inputs
/// collapse to the floor.
pub fn next_delay<R: Rng + ?Sized>(mean_ms: f64, spread_ms: f64, rng: &mut R) -> f64 {
    let u = nonzero_unit(rng);
    let v = nonzero_unit(rng);
    let z = (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos();

    let sample = mean_ms + spread_ms * z;
    if sample.is_finite() {
        sample.max(MIN_DELAY_MS)
    } else {
        MIN_DELAY_MS
    }
}

/// Per-session source of typing delays.
#[derive(Debug, Clone)]
pub struct TimingModel {
    rng: StdRng,
    spread_ratio: f64,
}

impl TimingModel {
    pub fn new(seed: Option<u64>, spread_ratio: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, spread_ratio }
    }

    pub fn delay_ms(&mut self, mean_ms: f64) -> f64 {
        next_delay(mean_ms, mean_ms * self.spread_ratio, &mut self.rng)
    }

    pub fn delay(&mut self, mean_ms: f64) -> Duration {
        Duration::try_from_secs_f64(self.delay_ms(mean_ms) / 1000.0).unwrap_or(Duration::MAX)
    }
}

impl Default for TimingModel {
    fn default() -> Self {
        Self::new(None, DEFAULT_SPREAD_RATIO)
    }
}
