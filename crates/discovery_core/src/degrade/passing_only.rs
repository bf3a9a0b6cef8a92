//! The canonical degrader: passing-only shrinkage detection with
//! scale-up-immediate / scale-down-hysteresis semantics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{AggregatedHealth, CalmTimer, DegradePass, Degrader, HasHealth};

/// Tracks a slow-moving estimate of the expected population (`total_nodes`)
/// and rejects snapshots that look like implausible shrinkage relative to
/// it.
///
/// Scale-up is trusted immediately so fresh fleets are adopted; scale-down
/// is only accepted if it persists for `calm_interval`, so blips (network
/// partitions, registry flaps) can't evict the healthy population.
pub struct PassingOnlyDegrader {
    total_nodes: Arc<AtomicU64>,
    threshold: f64,
    calm_interval: Duration,
    passing_only: bool,
    timer: CalmTimer,
}

impl PassingOnlyDegrader {
    pub fn new(threshold: f64, calm_interval: Duration, passing_only: bool) -> Self {
        let total_nodes = Arc::new(AtomicU64::new(0));
        let total_nodes_for_timer = Arc::clone(&total_nodes);
        let timer = CalmTimer::new(move |value| {
            total_nodes_for_timer.store(value, Ordering::SeqCst);
        });
        Self {
            total_nodes,
            threshold,
            calm_interval,
            passing_only,
            timer,
        }
    }

    pub fn total_nodes(&self) -> u64 {
        self.total_nodes.load(Ordering::SeqCst)
    }

    fn calc_total_nodes(&self, total: u64) {
        let current = self.total_nodes.load(Ordering::SeqCst);
        if current == 0 {
            self.total_nodes.store(total, Ordering::SeqCst);
            return;
        }
        if current == total {
            return;
        }
        if total > current {
            self.total_nodes.store(total, Ordering::SeqCst);
            self.timer.cancel();
        } else {
            self.timer.arm(self.calm_interval, total);
        }
    }

    fn should_degrade(&self, current: u64) -> bool {
        let total = self.total_nodes.load(Ordering::SeqCst);
        (current as f64) < (total as f64 * self.threshold).floor()
    }
}

impl<T: HasHealth + Clone> Degrader<T> for PassingOnlyDegrader {
    fn check_status(&self, entries: Vec<T>) -> Result<Vec<T>, DegradePass> {
        self.calc_total_nodes(entries.len() as u64);

        if self.should_degrade(entries.len() as u64) {
            self.timer.cancel();
            return Err(DegradePass);
        }

        if self.passing_only {
            let passing: Vec<T> = entries
                .iter()
                .filter(|e| {
                    matches!(
                        e.aggregated_health(),
                        AggregatedHealth::Passing | AggregatedHealth::Warning
                    )
                })
                .cloned()
                .collect();
            if !self.should_degrade(passing.len() as u64) {
                return Ok(passing);
            }
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::Identified;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        id: &'static str,
        health: AggregatedHealth,
    }

    impl Identified for Entry {
        fn entry_id(&self) -> &str {
            self.id
        }
        fn modify_index(&self) -> u64 {
            0
        }
    }

    impl HasHealth for Entry {
        fn aggregated_health(&self) -> AggregatedHealth {
            self.health
        }
    }

    fn entries(n: usize) -> Vec<Entry> {
        (0..n)
            .map(|i| Entry {
                id: Box::leak(i.to_string().into_boxed_str()),
                health: AggregatedHealth::Passing,
            })
            .collect()
    }

    #[test]
    fn scale_up_is_adopted_immediately() {
        let degrader = PassingOnlyDegrader::new(0.8, Duration::from_secs(3600), true);
        degrader.check_status(entries(10)).unwrap();
        assert_eq!(degrader.total_nodes(), 10);
        degrader.check_status(entries(15)).unwrap();
        assert_eq!(degrader.total_nodes(), 15);
    }

    #[test]
    fn scale_down_is_held_until_calm_interval_fires() {
        let degrader = PassingOnlyDegrader::new(0.5, Duration::from_millis(30), true);
        // first call establishes a baseline of 10 (and would not degrade: 10 >= 10*0.5)
        degrader.check_status(entries(10)).unwrap();
        assert_eq!(degrader.total_nodes(), 10);
        // second call with 6 entries: 6 >= floor(10*0.5)=5, so not degraded, but total_nodes
        // should not change immediately (scale-down hysteresis)
        degrader.check_status(entries(6)).unwrap();
        assert_eq!(degrader.total_nodes(), 10);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(degrader.total_nodes(), 6);
    }

    #[test]
    fn threshold_monotonicity_never_degrades_at_or_above_threshold() {
        let degrader = PassingOnlyDegrader::new(0.8, Duration::from_secs(3600), false);
        degrader.check_status(entries(10)).unwrap();
        // 8 >= ceil(10*0.8) = 8
        assert!(degrader.check_status(entries(8)).is_ok());
    }

    #[test]
    fn shrinkage_below_threshold_signals_degrade_pass() {
        let degrader = PassingOnlyDegrader::new(0.8, Duration::from_secs(3600), false);
        degrader.check_status(entries(10)).unwrap();
        assert_eq!(degrader.check_status(entries(7)), Err(DegradePass));
    }

    #[test]
    fn passing_only_filters_then_falls_back_to_unfiltered_on_over_filter_degrade() {
        let degrader = PassingOnlyDegrader::new(0.8, Duration::from_secs(3600), true);
        degrader.check_status(entries(10)).unwrap();
        let mut mixed = entries(10);
        for e in mixed.iter_mut().take(5) {
            e.health = AggregatedHealth::Critical;
        }
        // 5 passing out of 10 is below threshold (8), so the original unfiltered
        // list of 10 is returned unfiltered and accepted.
        let result = degrader.check_status(mixed.clone()).unwrap();
        assert_eq!(result.len(), 10);
    }
}
