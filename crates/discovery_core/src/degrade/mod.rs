//! Degraders: policy objects deciding whether a freshly-fetched endpoint
//! list is a statistically-suspicious shrinkage.

pub mod passing_only;
pub mod timer;

pub use passing_only::PassingOnlyDegrader;
pub use timer::CalmTimer;

use crate::dedup::Identified;

/// Internal-only signal: a degrader judged the snapshot statistically
/// suspicious. Never surfaced to callers outside the degrade/watch machinery
/// (see `discovery_core::error::DiscoveryError`, which deliberately has no
/// equivalent variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegradePass;

/// A policy deciding whether to accept, filter, or reject a fresh snapshot.
///
/// Run per-Watch, single-threaded; a `Watch` holds an ordered chain and uses
/// the first one that doesn't return `DegradePass`.
pub trait Degrader<T> {
    fn check_status(&self, entries: Vec<T>) -> Result<Vec<T>, DegradePass>;
}

/// Aggregated health as reported by the remote registry, used by
/// passing-only filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatedHealth {
    Passing,
    Warning,
    Critical,
}

/// The minimal shape a degrader needs beyond [`Identified`]: its aggregated
/// health status.
pub trait HasHealth: Identified {
    fn aggregated_health(&self) -> AggregatedHealth;
}

/// Run a chain of degraders in order. The first one whose `check_status`
/// does not return `DegradePass` wins and its output is used. If every
/// degrader in the chain signals `DegradePass`, the chain itself signals
/// `DegradePass` and `entries` is returned unchanged — this is the
/// "last non-pass outcome wins, pass only if everyone passes" rule.
pub fn check_degrade<T>(
    degraders: &[Box<dyn Degrader<T> + Send>],
    entries: Vec<T>,
) -> Result<Vec<T>, DegradePass>
where
    T: Clone,
{
    let mut current = entries;
    for degrader in degraders {
        match degrader.check_status(current.clone()) {
            Ok(accepted) => return Ok(accepted),
            Err(DegradePass) => continue,
        }
    }
    Err(DegradePass)
}
