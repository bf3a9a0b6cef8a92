//! A single-shot, cancellable, rearmable delayed action.
//!
//! Used by [`super::PassingOnlyDegrader`] to implement scale-down hysteresis:
//! a pending `total_nodes` value is only adopted if `calm_interval` passes
//! without a rearm. Cancellation and firing are serialized under the same
//! lock, so a cancelled or superseded arm can never fire its stale value.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

struct TimerState {
    deadline: Option<Instant>,
    pending_value: Option<u64>,
    shutdown: bool,
    generation: u64,
}

/// A cancellable single-shot timer that, on firing, calls back with the most
/// recently armed value.
pub struct CalmTimer {
    shared: Arc<(Mutex<TimerState>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

impl CalmTimer {
    pub fn new<F>(on_fire: F) -> Self
    where
        F: Fn(u64) + Send + 'static,
    {
        let shared = Arc::new((
            Mutex::new(TimerState {
                deadline: None,
                pending_value: None,
                shutdown: false,
                generation: 0,
            }),
            Condvar::new(),
        ));

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || {
            let (mutex, condvar) = &*worker_shared;
            loop {
                let mut guard = mutex.lock().expect("calm timer lock poisoned");
                if guard.shutdown {
                    return;
                }
                match guard.deadline {
                    None => {
                        guard = condvar.wait(guard).expect("calm timer lock poisoned");
                        drop(guard);
                    }
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            let value = guard.pending_value.take();
                            guard.deadline = None;
                            drop(guard);
                            if let Some(value) = value {
                                on_fire(value);
                            }
                        } else {
                            let (g, _timeout) = condvar
                                .wait_timeout(guard, deadline - now)
                                .expect("calm timer lock poisoned");
                            drop(g);
                        }
                    }
                }
            }
        });

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Arm (or rearm) the timer for `interval` from now, to fire with
    /// `value`. Any previously pending arm is superseded — "only the most
    /// recent target value takes effect".
    pub fn arm(&self, interval: Duration, value: u64) {
        let (mutex, condvar) = &*self.shared;
        let mut guard = mutex.lock().expect("calm timer lock poisoned");
        guard.generation += 1;
        guard.deadline = Some(Instant::now() + interval);
        guard.pending_value = Some(value);
        condvar.notify_all();
    }

    /// Cancel any pending arm. A no-op if nothing is armed.
    pub fn cancel(&self) {
        let (mutex, condvar) = &*self.shared;
        let mut guard = mutex.lock().expect("calm timer lock poisoned");
        guard.generation += 1;
        guard.deadline = None;
        guard.pending_value = None;
        condvar.notify_all();
    }

    /// True if a fire is currently pending.
    pub fn is_armed(&self) -> bool {
        let (mutex, _) = &*self.shared;
        mutex.lock().expect("calm timer lock poisoned").deadline.is_some()
    }
}

impl Drop for CalmTimer {
    fn drop(&mut self) {
        {
            let (mutex, condvar) = &*self.shared;
            let mut guard = mutex.lock().expect("calm timer lock poisoned");
            guard.shutdown = true;
            condvar.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
