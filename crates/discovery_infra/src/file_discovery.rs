//! Read-only discovery backed by a [`Dumper`]: the fallback source consulted
//! when every live registry adapter is fallback-worthy.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use discovery_core::error::DiscoveryError;
use discovery_core::options::DiscoveryCallOptions;
use discovery_core::service::{Service, ServiceKey};

use crate::dumper::{DumpError, Dumper};
use crate::facade::Discovery;

/// Lazily loads each key's slice from its `Dumper` once, then serves it from
/// memory for the rest of the process lifetime. `watch`/`notify` are no-ops —
/// this source never changes once loaded.
pub struct FileDiscovery {
    dumper: Arc<dyn Dumper>,
    loaded: RwLock<HashMap<ServiceKey, Arc<Vec<Service>>>>,
}

impl FileDiscovery {
    pub fn new(dumper: Arc<dyn Dumper>) -> Self {
        Self {
            dumper,
            loaded: RwLock::new(HashMap::new()),
        }
    }
}

impl Discovery for FileDiscovery {
    fn get_services(&self, name: &str, opts: &DiscoveryCallOptions) -> Result<Vec<Service>, DiscoveryError> {
        let key = ServiceKey::new(name, &opts.tags, opts.dc.clone().unwrap_or_default());

        if let Some(cached) = self.loaded.read().expect("file discovery lock poisoned").get(&key) {
            return Ok((**cached).clone());
        }

        let services = match self.dumper.load(&key) {
            Ok(services) => services,
            Err(DumpError::NotFound) => return Err(DiscoveryError::NotFound),
            Err(DumpError::Io(msg)) => return Err(DiscoveryError::Io(msg)),
        };

        self.loaded
            .write()
            .expect("file discovery lock poisoned")
            .insert(key, Arc::new(services.clone()));
        Ok(services)
    }

    fn watch(&self, _watcher: Box<dyn Fn(ServiceKey, Vec<Service>) + Send + Sync>) {}

    fn notify(&self, _event: discovery_core::event::Event) {}
}
