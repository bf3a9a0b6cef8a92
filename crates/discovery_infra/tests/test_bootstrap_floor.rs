//! E6: a primary backend's slice that falls short of its configured
//! bootstrap floor is treated as fallback-worthy even though it isn't empty.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use discovery_core::error::DiscoveryError;
use discovery_core::event::Event;
use discovery_core::options::DiscoveryCallOptions;
use discovery_core::service::{Service, ServiceKey};
use discovery_infra::facade::{Discovery, Registry, RegistryOptions};

fn service(id: &str) -> Service {
    let mut svc = Service::new("cart", 8080);
    svc.id = id.to_string();
    svc.ip = "10.0.0.1".to_string();
    svc
}

struct FixedDiscovery {
    result: Result<Vec<Service>, DiscoveryError>,
    degrade_events: AtomicUsize,
}

impl Discovery for FixedDiscovery {
    fn get_services(&self, _name: &str, _opts: &DiscoveryCallOptions) -> Result<Vec<Service>, DiscoveryError> {
        self.result.clone()
    }
    fn watch(&self, _watcher: Box<dyn Fn(ServiceKey, Vec<Service>) + Send + Sync>) {}
    fn notify(&self, event: Event) {
        if event == Event::Degrade {
            self.degrade_events.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn remote_below_bootstrap_floor_falls_through_to_file() {
    let remote = FixedDiscovery {
        result: Ok(vec![service("a"), service("b"), service("c")]),
        degrade_events: AtomicUsize::new(0),
    };
    let file = FixedDiscovery {
        result: Ok(vec![service("f1"), service("f2"), service("f3"), service("f4"), service("f5")]),
        degrade_events: AtomicUsize::new(0),
    };

    let mut bootstrap = HashMap::new();
    bootstrap.insert(ServiceKey::new("cart", &[], ""), 5);

    let options = RegistryOptions {
        discoveries: vec![Box::new(remote), Box::new(file)],
        bootstrap,
        ..RegistryOptions::default()
    };
    let registry = Registry::new(options);

    let services = registry.lookup_services("cart", &DiscoveryCallOptions::default()).unwrap();
    assert_eq!(services.len(), 5, "a remote slice under the bootstrap floor must fall through to file");
}

#[test]
fn remote_meeting_bootstrap_floor_is_returned_directly() {
    let remote = FixedDiscovery {
        result: Ok((0..5).map(|i| service(&format!("r{i}"))).collect()),
        degrade_events: AtomicUsize::new(0),
    };
    let file = FixedDiscovery {
        result: Ok(vec![service("f1")]),
        degrade_events: AtomicUsize::new(0),
    };

    let mut bootstrap = HashMap::new();
    bootstrap.insert(ServiceKey::new("cart", &[], ""), 5);

    let options = RegistryOptions {
        discoveries: vec![Box::new(remote), Box::new(file)],
        bootstrap,
        ..RegistryOptions::default()
    };
    let registry = Registry::new(options);

    let services = registry.lookup_services("cart", &DiscoveryCallOptions::default()).unwrap();
    assert_eq!(services.len(), 5, "a remote slice meeting the bootstrap floor is authoritative");
}
