//! The outer façade: fans discovery across ordered backends, fans
//! registration across ordered registrators, and implements the fallback
//! policy shared by both.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use discovery_core::error::DiscoveryError;
use discovery_core::event::Event;
use discovery_core::options::{DiscoveryCallOptions, FailType, RegistratorCallOptions};
use discovery_core::service::{Service, ServiceKey};

/// A discovery backend the façade can fan a lookup across: a live registry
/// adapter or a read-only file fallback.
pub trait Discovery: Send + Sync {
    fn get_services(&self, name: &str, opts: &DiscoveryCallOptions) -> Result<Vec<Service>, DiscoveryError>;
    /// Register a callback invoked whenever this backend publishes a fresh
    /// snapshot for some key. A backend with no push model (e.g. file
    /// fallback) may leave this a no-op.
    fn watch(&self, watcher: Box<dyn Fn(ServiceKey, Vec<Service>) + Send + Sync>);
    fn notify(&self, event: Event);
}

/// A registration backend.
pub trait Registrator: Send + Sync {
    fn register(&self, service: &Service, opts: &RegistratorCallOptions) -> Result<(), DiscoveryError>;
    fn deregister(&self, id: &str) -> Result<(), DiscoveryError>;
}

/// True iff `services` (or the accompanying `err`) should be treated as
/// fallback-worthy rather than authoritative: the error is `NotFound`, the
/// slice is empty, or it falls short of this key's configured bootstrap
/// floor.
pub fn is_fallback(
    key: &ServiceKey,
    services: &[Service],
    err: Option<&DiscoveryError>,
    bootstrap: &HashMap<ServiceKey, usize>,
) -> bool {
    if let Some(e) = err {
        if e.is_not_found() {
            return true;
        }
    }
    if services.is_empty() {
        return true;
    }
    if let Some(&min) = bootstrap.get(key) {
        if min > services.len() {
            return true;
        }
    }
    false
}

/// Construction-time wiring for a [`Registry`].
#[derive(Default)]
pub struct RegistryOptions {
    pub fail_type: FailType,
    pub registrators: Vec<Box<dyn Registrator>>,
    pub discoveries: Vec<Box<dyn Discovery>>,
    pub bootstrap: HashMap<ServiceKey, usize>,
}

struct RegistryInner {
    discoveries: Vec<Box<dyn Discovery>>,
    registrators: Arc<Vec<Box<dyn Registrator>>>,
    fail_type: FailType,
    bootstrap: HashMap<ServiceKey, usize>,
    watchers: Mutex<Vec<Box<dyn Fn(Vec<Service>) + Send + Sync>>>,
}

/// The top-level façade: fans a lookup out across ordered discoveries,
/// applying the fallback policy, and relays push updates to external
/// watchers, re-running the lookup first if the pushed snapshot itself
/// looks fallback-worthy.
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn new(options: RegistryOptions) -> Arc<Self> {
        let inner = Arc::new(RegistryInner {
            discoveries: options.discoveries,
            registrators: Arc::new(options.registrators),
            fail_type: options.fail_type,
            bootstrap: options.bootstrap,
            watchers: Mutex::new(Vec::new()),
        });
        let registry = Arc::new(Self { inner });
        registry.wire_relay();
        registry
    }

    fn wire_relay(self: &Arc<Self>) {
        for discovery in &self.inner.discoveries {
            let registry = Arc::clone(self);
            discovery.watch(Box::new(move |key, services| {
                registry.relay(key, services);
            }));
        }
    }

    fn relay(&self, key: ServiceKey, services: Vec<Service>) {
        let improved = if is_fallback(&key, &services, None, &self.inner.bootstrap) {
            let opts = DiscoveryCallOptions {
                dc: if key.dc.is_empty() { None } else { Some(key.dc.clone()) },
                tags: key.tags_vec(),
            };
            self.lookup_services(&key.name, &opts).unwrap_or(services)
        } else {
            services
        };

        for watcher in self.inner.watchers.lock().expect("registry lock poisoned").iter() {
            watcher(improved.clone());
        }
    }

    /// Register an external watcher, invoked with the best-known snapshot
    /// whenever any discovery backend publishes a push update.
    pub fn watch(&self, watcher: Box<dyn Fn(Vec<Service>) + Send + Sync>) {
        self.inner.watchers.lock().expect("registry lock poisoned").push(watcher);
    }

    pub fn lookup_services(&self, name: &str, opts: &DiscoveryCallOptions) -> Result<Vec<Service>, DiscoveryError> {
        let key = ServiceKey::new(name, &opts.tags, opts.dc.clone().unwrap_or_default());
        let mut best: Option<Vec<Service>> = None;
        let mut last_err: Option<DiscoveryError> = None;

        for discovery in &self.inner.discoveries {
            match discovery.get_services(name, opts) {
                Ok(services) => {
                    if is_fallback(&key, &services, None, &self.inner.bootstrap) {
                        discovery.notify(Event::Degrade);
                        if best.as_ref().map_or(true, |b| services.len() > b.len()) {
                            best = Some(services);
                        }
                    } else {
                        discovery.notify(Event::Recover);
                        return Ok(services);
                    }
                }
                Err(e) => {
                    if is_fallback(&key, &[], Some(&e), &self.inner.bootstrap) {
                        discovery.notify(Event::Degrade);
                    }
                    let fail_fast = self.inner.fail_type == FailType::FailFast;
                    last_err = Some(e);
                    if fail_fast {
                        return Err(last_err.expect("just set"));
                    }
                }
            }
        }

        best.map(Ok).unwrap_or_else(|| Err(last_err.unwrap_or(DiscoveryError::NotFound)))
    }

    pub fn register(&self, service: Service, opts: RegistratorCallOptions) -> Result<RegistrationHandle, DiscoveryError> {
        let mut last_err = None;
        let mut any_succeeded = false;

        for registrator in self.inner.registrators.iter() {
            match registrator.register(&service, &opts) {
                Ok(()) => any_succeeded = true,
                Err(e) => {
                    last_err = Some(e);
                    if self.inner.fail_type == FailType::FailFast {
                        break;
                    }
                }
            }
        }

        if !any_succeeded {
            if let Some(e) = last_err {
                return Err(e);
            }
        }

        Ok(RegistrationHandle {
            id: service.id,
            registrators: Arc::clone(&self.inner.registrators),
        })
    }
}

/// A live registration, able to deregister from every registrator it was
/// sent to.
pub struct RegistrationHandle {
    id: String,
    registrators: Arc<Vec<Box<dyn Registrator>>>,
}

impl RegistrationHandle {
    /// Deregister from every registrator, best-effort: every one is
    /// attempted regardless of earlier failures, and the last error (if
    /// any) is returned.
    pub fn deregister(&self) -> Result<(), DiscoveryError> {
        let mut last_err = None;
        for registrator in self.registrators.iter() {
            if let Err(e) = registrator.deregister(&self.id) {
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
