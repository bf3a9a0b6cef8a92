//! The remote-registry contract: an injected collaborator performing
//! blocking index-based reads and service registration. The wire protocol
//! itself is out of scope — any implementation honoring this trait works.

pub mod entry;

pub use entry::{AggregatedStatus, Checks, RemoteEntry, Weights};

use std::time::Duration;

use discovery_core::error::DiscoveryError;
use discovery_core::service::{HealthCheck, HealthCheckKind};

/// A check declaration as sent to the registry at registration time.
#[derive(Debug, Clone)]
pub struct CheckSpec {
    pub name: String,
    pub kind: HealthCheckKind,
    pub uri: String,
    pub method: Option<String>,
    pub header: Option<std::collections::HashMap<String, Vec<String>>>,
    pub interval: Duration,
    pub status: discovery_core::service::CheckStatus,
    pub deregister_critical_after: Duration,
}

impl From<&HealthCheck> for CheckSpec {
    fn from(check: &HealthCheck) -> Self {
        Self {
            name: check.name.clone(),
            kind: check.kind,
            uri: check.uri.clone(),
            method: check.method.clone(),
            header: check.header.clone(),
            interval: check.interval(),
            status: check.status,
            deregister_critical_after: discovery_core::options::DEFAULT_SERVICE_DEREGISTER_CRITICAL_AFTER,
        }
    }
}

/// Full registration payload for `service_register`.
#[derive(Debug, Clone)]
pub struct RegisterSpec {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub meta: std::collections::HashMap<String, String>,
    pub weights: Weights,
    pub checks: Vec<CheckSpec>,
}

/// Convert a raw registry entry into the library's own [`discovery_core::service::Service`]
/// shape. Weight is taken from the `"weight"` meta entry when present and
/// parseable, else the documented default.
pub fn to_service(entry: &RemoteEntry) -> discovery_core::service::Service {
    let weight = entry
        .meta
        .get("weight")
        .and_then(|w| w.parse::<i32>().ok())
        .unwrap_or(discovery_core::options::DEFAULT_SERVICE_WEIGHT);

    let mut service = discovery_core::service::Service::new(entry.service.clone(), entry.port);
    service.id = entry.id.clone();
    service.ip = entry.address.clone();
    service.weight = weight;
    service.tags = entry.tags.clone();
    service.meta = entry.meta.clone();
    service
}

/// The injected remote-registry collaborator.
pub trait RemoteRegistry: Send + Sync {
    /// A long-poll read: blocks until the registry's state advances past
    /// `wait_index` or `wait_time` elapses.
    fn blocking_service_read(
        &self,
        name: &str,
        tags: &[String],
        dc: Option<&str>,
        allow_stale: bool,
        wait_index: u64,
        wait_time: Duration,
        passing_only: bool,
    ) -> Result<(Vec<RemoteEntry>, u64), DiscoveryError>;

    /// A non-blocking catalog read.
    fn catalog_read(
        &self,
        name: &str,
        tags: &[String],
        dc: Option<&str>,
        allow_stale: bool,
    ) -> Result<Vec<RemoteEntry>, DiscoveryError>;

    fn service_register(&self, spec: &RegisterSpec) -> Result<(), DiscoveryError>;
    fn service_deregister(&self, id: &str) -> Result<(), DiscoveryError>;
}
