//! One blocking-poll/backoff/degrade loop per discovered key, running on its
//! own thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::warn;

use discovery_core::dedup::dedup_by_id;
use discovery_core::degrade::{check_degrade, DegradePass, Degrader};
use discovery_core::jitter::{sliding_duration, RngSource};
use discovery_core::options::DEFAULT_WATCH_ROLLING_WINDOW_SIZE;
use discovery_core::rolling_window::RollingWindow;
use discovery_core::service::ServiceKey;

use crate::remote::{RemoteEntry, RemoteRegistry};

/// One accepted read, ready for the adapter's event loop to install.
///
/// `is_overwrite` is always `true` for a published snapshot: the Watch never
/// publishes a degrade-dropped read, so an empty `entries` here is always a
/// truthful "this service currently has no live endpoints", not a dropped
/// snapshot's absence.
#[derive(Debug, Clone)]
pub struct WatchSnapshot {
    pub key: ServiceKey,
    pub index: u64,
    pub entries: Vec<RemoteEntry>,
    pub is_overwrite: bool,
}

/// Per-watch tunables that don't change for the lifetime of the watch.
pub struct WatchConfig {
    pub key: ServiceKey,
    pub wait_time: Duration,
    pub allow_stale: bool,
    pub passing_only: bool,
    pub degraders: Vec<Box<dyn Degrader<RemoteEntry> + Send>>,
}

/// Handle to a running watch thread. Dropping it stops the thread and joins
/// it.
pub struct Watch {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watch {
    pub fn spawn(
        config: WatchConfig,
        registry: Arc<dyn RemoteRegistry>,
        rng: Arc<dyn RngSource + Send + Sync>,
        watch_tx: SyncSender<WatchSnapshot>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);

        let handle = std::thread::spawn(move || run(config, registry, rng.as_ref(), watch_tx, stop_for_thread));

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Backoff ladder, matching the documented ordering: later thresholds
/// overwrite earlier ones when both match.
fn compute_delay(rolling: &RollingWindow) -> Duration {
    let mut delay = Duration::ZERO;
    if rolling.is_match(1, 2) {
        delay = Duration::from_secs(1);
    }
    if rolling.is_match(3, 3) {
        delay = Duration::from_secs(2);
    }
    if rolling.is_match(6, 4) {
        delay = Duration::from_secs(3);
    }
    if rolling.is_match(10, 5) {
        delay = Duration::from_secs(5);
    }
    delay
}

fn run(
    config: WatchConfig,
    registry: Arc<dyn RemoteRegistry>,
    rng: &dyn RngSource,
    watch_tx: SyncSender<WatchSnapshot>,
    stop: Arc<AtomicBool>,
) {
    let WatchConfig {
        key,
        wait_time,
        allow_stale,
        passing_only,
        degraders,
    } = config;

    let tags = key.tags_vec();
    let dc = if key.dc.is_empty() { None } else { Some(key.dc.as_str()) };

    let mut last_index = 0u64;
    let mut inited = false;
    let mut rolling = RollingWindow::new(DEFAULT_WATCH_ROLLING_WINDOW_SIZE);

    while !stop.load(Ordering::SeqCst) {
        let read = registry.blocking_service_read(
            &key.name,
            &tags,
            dc,
            allow_stale,
            last_index,
            wait_time,
            passing_only,
        );

        let (entries, new_index) = match read {
            Ok(result) => result,
            Err(e) => {
                warn!(key = %key, error = %e, "blocking read failed, retrying");
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }
        };

        let deduped = dedup_by_id(entries);
        let accepted = match check_degrade(&degraders, deduped.clone()) {
            Ok(accepted) => Some(accepted),
            Err(DegradePass) => {
                if inited {
                    None
                } else {
                    Some(deduped)
                }
            }
        };
        inited = true;

        if let Some(entries) = accepted {
            let snapshot = WatchSnapshot {
                key: key.clone(),
                index: new_index,
                entries,
                is_overwrite: true,
            };
            if watch_tx.send(snapshot).is_err() {
                return;
            }
        }

        if new_index == last_index {
            last_index = new_index;
            continue;
        }

        rolling.incr();
        let delay = compute_delay(&rolling);
        if delay > Duration::ZERO {
            std::thread::sleep(sliding_duration(delay, rng));
        }
        last_index = new_index;
    }
}
