//! The registry adapter: owns the remote-registry client, the service
//! cache, the set of active watches, and the single background event loop
//! that is the sole writer to both.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, warn};

use discovery_core::dedup::dedup_by_id;
use discovery_core::degrade::{AggregatedHealth, Degrader, HasHealth, PassingOnlyDegrader};
use discovery_core::error::DiscoveryError;
use discovery_core::event::Event;
use discovery_core::hostname::{default_zone, HostnameSource};
use discovery_core::jitter::RngSource;
use discovery_core::options::{
    AdapterOptions, DiscoveryCallOptions, RegistratorCallOptions, DEFAULT_RETRY_INTERVAL,
    DEFAULT_RETRY_TIMES, DEFAULT_SERVICE_CHECK_INTERVAL, DEFAULT_SERVICE_META_CLOUD,
    DEFAULT_SERVICE_META_CONTAINER, DEFAULT_SERVICE_META_REGISTRY, DEFAULT_SERVICE_WEIGHT,
};
use discovery_core::cache::ServiceCache;
use discovery_core::service::{HealthCheck, HealthCheckKind, Service, ServiceKey};

use crate::dump_coordinator::DumpCoordinator;
use crate::dumper::Dumper;
use crate::facade::{Discovery, Registrator};
use crate::remote::{to_service, CheckSpec, RegisterSpec, RemoteEntry, RemoteRegistry, Weights};
use crate::single_flight::SingleFlight;
use crate::watch::{Watch, WatchConfig, WatchSnapshot};

/// Bounded queue capacity for the adapter's internal channels, matching the
/// dump coordinator's.
const CHANNEL_CAPACITY: usize = 10;

struct Shared {
    cache: ServiceCache,
    registry: Arc<dyn RemoteRegistry>,
    options: AdapterOptions,
    watches: Mutex<HashMap<ServiceKey, Watch>>,
    external_watcher: Mutex<Option<Box<dyn Fn(ServiceKey, Vec<Service>) + Send + Sync>>>,
    dump_coordinator: Option<DumpCoordinator>,
    degraded: AtomicBool,
}

fn fetch_once(shared: &Shared, key: &ServiceKey) -> Result<Vec<RemoteEntry>, DiscoveryError> {
    let tags = key.tags_vec();
    let dc = if key.dc.is_empty() { None } else { Some(key.dc.as_str()) };

    if shared.options.first_fetch_use_catalog {
        let entries = shared.registry.catalog_read(&key.name, &tags, dc, shared.options.stale)?;
        // catalog_read has no server-side passing_only knob (unlike the blocking
        // read), so a caller-requested filter has to happen here before dedup.
        if shared.options.passing_only {
            Ok(entries
                .into_iter()
                .filter(|e| e.aggregated_health() == AggregatedHealth::Passing)
                .collect())
        } else {
            Ok(entries)
        }
    } else {
        shared
            .registry
            .blocking_service_read(
                &key.name,
                &tags,
                dc,
                shared.options.stale,
                0,
                shared.options.clamped_watch_wait_time(),
                shared.options.passing_only,
            )
            .map(|(entries, _index)| entries)
    }
}

fn build_degraders(options: &AdapterOptions) -> Vec<Box<dyn Degrader<RemoteEntry> + Send>> {
    if options.threshold <= 0.0 {
        return Vec::new();
    }
    vec![Box::new(PassingOnlyDegrader::new(
        options.threshold,
        options.calm_interval,
        options.passing_only,
    ))]
}

fn retry<T>(attempts: u32, interval: Duration, mut op: impl FnMut(u32) -> Result<T, DiscoveryError>) -> Result<T, DiscoveryError> {
    let mut last_err = None;
    for attempt in 1..=attempts {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_err = Some(e);
                if attempt < attempts {
                    std::thread::sleep(interval);
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt always runs"))
}

/// Owns a live connection to a remote registry: the service cache, active
/// watches, and the single background event loop serving them.
pub struct RegistryAdapter {
    shared: Arc<Shared>,
    addresses: Arc<dyn discovery_core::service::AddressResolver + Send + Sync>,
    hostname: Arc<dyn HostnameSource + Send + Sync>,
    single_flight: SingleFlight<String, Result<Vec<Service>, DiscoveryError>>,
    actor_tx: SyncSender<ServiceKey>,
    watch_tx: SyncSender<WatchSnapshot>,
    stop_tx: SyncSender<()>,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl RegistryAdapter {
    pub fn new(
        registry: Arc<dyn RemoteRegistry>,
        options: AdapterOptions,
        dumper: Option<Arc<dyn Dumper>>,
        addresses: Arc<dyn discovery_core::service::AddressResolver + Send + Sync>,
        hostname: Arc<dyn HostnameSource + Send + Sync>,
        rng: Arc<dyn RngSource + Send + Sync>,
    ) -> Arc<Self> {
        let dump_coordinator = dumper.map(|d| DumpCoordinator::spawn(d, options.watch_dump_interval));

        let shared = Arc::new(Shared {
            cache: ServiceCache::new(),
            registry,
            options,
            watches: Mutex::new(HashMap::new()),
            external_watcher: Mutex::new(None),
            dump_coordinator,
            degraded: AtomicBool::new(false),
        });

        let (actor_tx, actor_rx) = sync_channel(CHANNEL_CAPACITY);
        let (watch_tx, watch_rx) = sync_channel(CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = sync_channel(CHANNEL_CAPACITY);

        let loop_shared = Arc::clone(&shared);
        let loop_watch_tx = watch_tx.clone();
        let event_loop = std::thread::spawn(move || {
            run_event_loop(loop_shared, actor_rx, watch_rx, stop_rx, loop_watch_tx, rng)
        });

        Arc::new(Self {
            shared,
            addresses,
            hostname,
            single_flight: SingleFlight::new(),
            actor_tx,
            watch_tx,
            stop_tx,
            event_loop: Mutex::new(Some(event_loop)),
        })
    }

    pub fn notify(&self, event: Event) {
        let should_disable = match event {
            Event::Degrade => true,
            Event::Recover => false,
        };
        let was = self.shared.degraded.swap(should_disable, Ordering::SeqCst);
        if was != should_disable {
            if let Some(coordinator) = &self.shared.dump_coordinator {
                coordinator.set_disabled(should_disable);
            }
        }
    }

    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.event_loop.lock().expect("adapter lock poisoned").take() {
            let _ = handle.join();
        }
    }
}

impl Discovery for RegistryAdapter {
    fn get_services(&self, name: &str, opts: &DiscoveryCallOptions) -> Result<Vec<Service>, DiscoveryError> {
        let key = ServiceKey::new(name, &opts.tags, opts.dc.clone().unwrap_or_default());

        if let Some(cached) = self.shared.cache.get(&key) {
            return Ok((*cached).clone());
        }

        let shared = Arc::clone(&self.shared);
        let actor_tx = self.actor_tx.clone();
        let key_for_fetch = key.clone();
        let result = self.single_flight.execute(key.to_string(), move || -> Result<Vec<Service>, DiscoveryError> {
            let entries = fetch_once(&shared, &key_for_fetch)?;
            let deduped = dedup_by_id(entries);
            let services: Vec<Service> = deduped.iter().map(to_service).collect();
            shared.cache.set(key_for_fetch.clone(), services.clone());
            let _ = actor_tx.send(key_for_fetch);
            Ok(services)
        });

        (*result).clone()
    }

    fn watch(&self, watcher: Box<dyn Fn(ServiceKey, Vec<Service>) + Send + Sync>) {
        *self.shared.external_watcher.lock().expect("adapter lock poisoned") = Some(watcher);
    }

    fn notify(&self, event: Event) {
        RegistryAdapter::notify(self, event);
    }
}

impl Registrator for RegistryAdapter {
    fn register(&self, service: &Service, opts: &RegistratorCallOptions) -> Result<(), DiscoveryError> {
        let mut service = service.clone();
        service.fill_defaults(self.addresses.as_ref(), self.hostname.as_ref());
        service.validate_for_registration()?;

        let mut meta = service.meta.clone();
        meta.insert("cloud".to_string(), DEFAULT_SERVICE_META_CLOUD.to_string());
        meta.insert("container".to_string(), DEFAULT_SERVICE_META_CONTAINER.to_string());
        meta.insert("registry".to_string(), DEFAULT_SERVICE_META_REGISTRY.to_string());
        meta.insert("zone".to_string(), default_zone(&self.hostname.hostname()));
        for (k, v) in &opts.metadata {
            meta.insert(k.clone(), v.clone());
        }

        let weight = if service.weight == 0 { DEFAULT_SERVICE_WEIGHT } else { service.weight };
        meta.entry("weight".to_string()).or_insert_with(|| weight.to_string());

        let mut checks: Vec<CheckSpec> = opts.checks.iter().map(CheckSpec::from).collect();
        if checks.is_empty() {
            let default_check = HealthCheck::new(HealthCheckKind::Tcp, format!("{}-tcp", service.name), service.addr())
                .with_interval(DEFAULT_SERVICE_CHECK_INTERVAL);
            checks.push(CheckSpec::from(&default_check));
        }

        let spec = RegisterSpec {
            id: service.id.clone(),
            name: service.name.clone(),
            address: service.ip.clone(),
            port: service.port,
            tags: service.tags.clone(),
            meta,
            weights: Weights { passing: weight, warning: weight },
            checks,
        };

        retry(DEFAULT_RETRY_TIMES, DEFAULT_RETRY_INTERVAL, |attempt| {
            match self.shared.registry.service_register(&spec) {
                Ok(()) => {
                    info!(id = %spec.id, "service registered");
                    Ok(())
                }
                Err(e) => {
                    warn!(id = %spec.id, attempt, error = %e, "register attempt failed");
                    Err(e)
                }
            }
        })
    }

    fn deregister(&self, id: &str) -> Result<(), DiscoveryError> {
        retry(DEFAULT_RETRY_TIMES, DEFAULT_RETRY_INTERVAL, |attempt| {
            match self.shared.registry.service_deregister(id) {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!(id, attempt, error = %e, "deregister attempt failed");
                    Err(e)
                }
            }
        })
    }
}

fn run_event_loop(
    shared: Arc<Shared>,
    actor_rx: Receiver<ServiceKey>,
    watch_rx: Receiver<WatchSnapshot>,
    stop_rx: Receiver<()>,
    watch_tx: SyncSender<WatchSnapshot>,
    rng: Arc<dyn RngSource + Send + Sync>,
) {
    loop {
        if stop_rx.try_recv().is_ok() {
            shared.watches.lock().expect("adapter lock poisoned").clear();
            return;
        }

        match actor_rx.try_recv() {
            Ok(key) => {
                let mut watches = shared.watches.lock().expect("adapter lock poisoned");
                watches.entry(key.clone()).or_insert_with(|| {
                    let config = WatchConfig {
                        key: key.clone(),
                        wait_time: shared.options.clamped_watch_wait_time(),
                        allow_stale: shared.options.stale,
                        passing_only: shared.options.passing_only,
                        degraders: build_degraders(&shared.options),
                    };
                    Watch::spawn(config, Arc::clone(&shared.registry), Arc::clone(&rng), watch_tx.clone())
                });
                continue;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return,
        }

        match watch_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(snapshot) => {
                let services: Vec<Service> = snapshot.entries.iter().map(to_service).collect();
                shared.cache.set(snapshot.key.clone(), services.clone());

                if let Some(coordinator) = &shared.dump_coordinator {
                    coordinator.push(snapshot.key.clone(), services.clone());
                }

                if let Some(watcher) = shared.external_watcher.lock().expect("adapter lock poisoned").as_ref() {
                    watcher(snapshot.key, services);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
