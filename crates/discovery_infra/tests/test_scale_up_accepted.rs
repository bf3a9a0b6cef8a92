//! E3: a scale-up is trusted immediately — no hysteresis delay, unlike a
//! shrinkage (see `test_shrinkage_below_threshold.rs`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use discovery_core::error::DiscoveryError;
use discovery_core::hostname::StaticHostname;
use discovery_core::jitter::FixedFraction;
use discovery_core::options::{AdapterOptions, DiscoveryCallOptions};
use discovery_core::service::AddressResolver;
use discovery_infra::adapter::RegistryAdapter;
use discovery_infra::facade::Discovery;
use discovery_infra::remote::{AggregatedStatus, Checks, RegisterSpec, RemoteEntry, RemoteRegistry, Weights};

struct FixedAddresses;
impl AddressResolver for FixedAddresses {
    fn resolve_template(&self, _template: &str) -> Option<String> {
        None
    }
    fn first_private_ipv4(&self) -> Option<String> {
        Some("10.0.0.9".to_string())
    }
}

fn entry(id: &str, modify_index: u64) -> RemoteEntry {
    RemoteEntry {
        id: id.to_string(),
        service: "svc".to_string(),
        tags: Vec::new(),
        address: "10.1.0.1".to_string(),
        port: 8080,
        meta: HashMap::new(),
        checks: Checks {
            aggregated_status: AggregatedStatus::Passing,
        },
        modify_index,
        weights: Weights::default(),
    }
}

fn entries(n: usize, prefix: &str, index: u64) -> Vec<RemoteEntry> {
    (0..n).map(|i| entry(&format!("{prefix}{i}"), index)).collect()
}

struct ScriptedRegistry {
    initial: Vec<RemoteEntry>,
    reads: Mutex<Vec<(Vec<RemoteEntry>, u64)>>,
    call_count: AtomicUsize,
}

impl RemoteRegistry for ScriptedRegistry {
    fn blocking_service_read(
        &self,
        _name: &str,
        _tags: &[String],
        _dc: Option<&str>,
        _allow_stale: bool,
        _wait_index: u64,
        _wait_time: Duration,
        _passing_only: bool,
    ) -> Result<(Vec<RemoteEntry>, u64), DiscoveryError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        let reads = self.reads.lock().unwrap();
        if idx < reads.len() {
            Ok(reads[idx].clone())
        } else {
            std::thread::sleep(Duration::from_millis(20));
            Ok(reads.last().cloned().unwrap_or((Vec::new(), 0)))
        }
    }

    fn catalog_read(
        &self,
        _name: &str,
        _tags: &[String],
        _dc: Option<&str>,
        _allow_stale: bool,
    ) -> Result<Vec<RemoteEntry>, DiscoveryError> {
        Ok(self.initial.clone())
    }

    fn service_register(&self, _spec: &RegisterSpec) -> Result<(), DiscoveryError> {
        Ok(())
    }

    fn service_deregister(&self, _id: &str) -> Result<(), DiscoveryError> {
        Ok(())
    }
}

#[test]
fn scale_up_is_adopted_without_waiting_for_a_calm_interval() {
    let registry = Arc::new(ScriptedRegistry {
        initial: entries(10, "base", 0),
        reads: Mutex::new(vec![
            (entries(10, "base", 1), 1),
            (entries(15, "grown", 2), 2),
        ]),
        call_count: AtomicUsize::new(0),
    });

    let options = AdapterOptions {
        first_fetch_use_catalog: true,
        threshold: 0.8,
        passing_only: false,
        calm_interval: Duration::from_secs(3600),
        ..AdapterOptions::default()
    };
    let adapter = RegistryAdapter::new(
        Arc::clone(&registry) as Arc<dyn RemoteRegistry>,
        options,
        None,
        Arc::new(FixedAddresses),
        Arc::new(StaticHostname::new("worker-1")),
        Arc::new(FixedFraction(0.0)),
    );

    let opts = DiscoveryCallOptions::default();
    adapter.get_services("svc", &opts).unwrap();

    let mut last_len = 0;
    for _ in 0..100 {
        last_len = adapter.get_services("svc", &opts).unwrap().len();
        if last_len == 15 {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(
        last_len, 15,
        "scale-up from 10 to 15 must be reflected without waiting out a calm interval"
    );

    adapter.stop();
}
