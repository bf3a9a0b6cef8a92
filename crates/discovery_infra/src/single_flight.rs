//! Keyed call coalescer: concurrent callers for the same key share one
//! underlying call instead of each issuing their own.
//!
//! Leader/follower pattern: the first caller for a key runs the closure and
//! broadcasts its result; later callers for the same in-flight key park on
//! the leader's completion signal.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex};

struct Flight<T> {
    result: Mutex<Option<Arc<T>>>,
    done: Condvar,
}

/// A per-key in-flight call registry.
pub struct SingleFlight<K, T> {
    inflight: Mutex<HashMap<K, Arc<Flight<T>>>>,
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, T> SingleFlight<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` at most once per key among concurrent callers. Every caller
    /// for the same in-flight key observes the same `Arc<T>`.
    pub fn execute(&self, key: K, f: impl FnOnce() -> T) -> Arc<T> {
        let flight = {
            let mut inflight = self.inflight.lock().expect("single-flight lock poisoned");
            if let Some(existing) = inflight.get(&key) {
                Arc::clone(existing)
            } else {
                let flight = Arc::new(Flight {
                    result: Mutex::new(None),
                    done: Condvar::new(),
                });
                inflight.insert(key.clone(), Arc::clone(&flight));
                drop(inflight);

                let value = Arc::new(f());
                *flight.result.lock().expect("single-flight lock poisoned") = Some(Arc::clone(&value));
                flight.done.notify_all();
                self.inflight
                    .lock()
                    .expect("single-flight lock poisoned")
                    .remove(&key);
                return value;
            }
        };

        let mut result = flight.result.lock().expect("single-flight lock poisoned");
        while result.is_none() {
            result = flight.done.wait(result).expect("single-flight lock poisoned");
        }
        Arc::clone(result.as_ref().expect("result set before notify"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn concurrent_misses_for_the_same_key_coalesce_into_one_call() {
        let flight: Arc<SingleFlight<String, usize>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flight = Arc::clone(&flight);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    *flight.execute("cart".to_string(), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        42
                    })
                })
            })
            .collect();

        let results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.iter().all(|&r| r == 42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_keys_each_get_their_own_call() {
        let flight: SingleFlight<&'static str, usize> = SingleFlight::new();
        assert_eq!(*flight.execute("a", || 1), 1);
        assert_eq!(*flight.execute("b", || 2), 2);
    }

    #[test]
    fn sequential_calls_for_the_same_key_both_run() {
        let flight: SingleFlight<&'static str, usize> = SingleFlight::new();
        let calls = AtomicUsize::new(0);
        flight.execute("a", || {
            calls.fetch_add(1, Ordering::SeqCst)
        });
        flight.execute("a", || {
            calls.fetch_add(1, Ordering::SeqCst)
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
