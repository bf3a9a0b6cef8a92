//! Throttles writes to a [`Dumper`] per key, disabled while an adapter is
//! degraded.

use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use discovery_core::service::{Service, ServiceKey};
use tracing::{debug, warn};

use crate::dumper::{DumpError, Dumper};

/// Bounded queue capacity for the dump/disable channels, matching every
/// other inter-thread queue in this adapter (see `crate::adapter`).
pub const CHANNEL_CAPACITY: usize = 10;

/// The pure throttling decision, factored out of the thread plumbing so it
/// is directly unit-testable with injected timestamps.
pub struct DumpThrottle {
    dumper: Arc<dyn Dumper>,
    interval: Duration,
    last: HashMap<ServiceKey, SystemTime>,
    disabled: bool,
}

impl DumpThrottle {
    pub fn new(dumper: Arc<dyn Dumper>, interval: Duration) -> Self {
        Self {
            dumper,
            interval,
            last: HashMap::new(),
            disabled: false,
        }
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Apply one incoming `(key, services)` push at time `now`.
    pub fn handle_push(&mut self, key: ServiceKey, services: &[Service], now: SystemTime) {
        if self.disabled {
            debug!(key = %key, "dump skipped: adapter degraded");
            return;
        }

        if let Some(&last) = self.last.get(&key) {
            if now < last + self.interval {
                debug!(key = %key, "dump skipped: within throttle interval");
                return;
            }
        }

        match self.dumper.last_modify(&key) {
            Err(DumpError::NotFound) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "dump skipped: last_modify failed");
                return;
            }
            Ok(disk_mtime) => {
                if disk_mtime + self.interval > now {
                    self.last.insert(key, disk_mtime);
                    return;
                }
            }
        }

        match self.dumper.store(&key, services) {
            Ok(()) => {
                self.last.insert(key, now);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "dump write failed, will retry next eligible push");
            }
        }
    }
}

enum DumpMessage {
    Push(ServiceKey, Vec<Service>),
}

/// The backgrounded dump coordinator: a dedicated thread draining a
/// bounded push queue and a bounded disable-toggle queue.
pub struct DumpCoordinator {
    dump_tx: SyncSender<DumpMessage>,
    disable_tx: SyncSender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl DumpCoordinator {
    pub fn spawn(dumper: Arc<dyn Dumper>, interval: Duration) -> Self {
        let (dump_tx, dump_rx) = sync_channel(CHANNEL_CAPACITY);
        let (disable_tx, disable_rx) = sync_channel(CHANNEL_CAPACITY);

        let worker = std::thread::spawn(move || run(dumper, interval, dump_rx, disable_rx));

        Self {
            dump_tx,
            disable_tx,
            worker: Some(worker),
        }
    }

    /// Enqueue a cache slice for throttled persistence. Blocks briefly if
    /// the queue is full, applying backpressure by design.
    pub fn push(&self, key: ServiceKey, services: Vec<Service>) {
        let _ = self.dump_tx.send(DumpMessage::Push(key, services));
    }

    pub fn set_disabled(&self, disabled: bool) {
        let _ = self.disable_tx.send(disabled);
    }
}

impl Drop for DumpCoordinator {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run(
    dumper: Arc<dyn Dumper>,
    interval: Duration,
    dump_rx: Receiver<DumpMessage>,
    disable_rx: Receiver<bool>,
) {
    let mut throttle = DumpThrottle::new(dumper, interval);

    loop {
        match disable_rx.try_recv() {
            Ok(disabled) => {
                throttle.set_disabled(disabled);
                continue;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                // No more disable toggles can ever arrive; keep serving pushes.
            }
        }

        match dump_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(DumpMessage::Push(key, services)) => {
                throttle.handle_push(key, &services, SystemTime::now());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
