//! Backoff jitter: `delay + rand ∈ [0, delay/16)`, the "sliding duration".

use std::time::Duration;

/// Injectable source of randomness, so backoff jitter is deterministic in
/// tests. The default, `rand`-backed implementation lives in
/// `discovery_infra` to keep this crate free of the `rand` dependency.
pub trait RngSource {
    /// A uniformly distributed value in `[0, 1)`.
    fn next_fraction(&self) -> f64;
}

/// A fixed fraction, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedFraction(pub f64);

impl RngSource for FixedFraction {
    fn next_fraction(&self) -> f64 {
        self.0
    }
}

/// `delay + jitter` where `jitter` is drawn uniformly from `[0, delay/16)`.
///
/// `delay == 0` returns `0` unchanged (no jitter is added to a zero backoff).
pub fn sliding_duration(delay: Duration, rng: &dyn RngSource) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let max_jitter = delay.as_secs_f64() / 16.0;
    let jitter = max_jitter * rng.next_fraction();
    delay + Duration::from_secs_f64(jitter)
}
