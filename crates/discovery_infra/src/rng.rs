//! Default, process-wide random source for backoff jitter.

use discovery_core::jitter::RngSource;
use rand::Rng;

/// Thread-local-rng-backed [`RngSource`]. Seeded once per thread by `rand`
/// itself; callers that need determinism should use
/// `discovery_core::jitter::FixedFraction` instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRng;

impl RngSource for ThreadRng {
    fn next_fraction(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}
