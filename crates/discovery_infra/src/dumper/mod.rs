//! Persist and reload cache slices to a local directory: the process's
//! fallback mirror of discovery results.

pub mod file;

pub use file::FileDumper;

use std::collections::HashMap;
use std::time::SystemTime;

use discovery_core::service::{Service, ServiceKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to the dumper's file I/O.
#[derive(Debug, Error)]
pub enum DumpError {
    /// No file exists yet for this key.
    #[error("dump not found")]
    NotFound,
    #[error("dump io error: {0}")]
    Io(String),
}

/// Which JSON shape a dump file is written/read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpDialect {
    /// Native `Service` records.
    Discovery,
    /// Records shaped like the remote registry's `/health/service`
    /// response.
    Consul,
}

/// Persist/read snapshots of a cache slice to a local directory.
pub trait Dumper: Send + Sync {
    fn last_modify(&self, key: &ServiceKey) -> Result<SystemTime, DumpError>;
    fn store(&self, key: &ServiceKey, services: &[Service]) -> Result<(), DumpError>;
    fn load(&self, key: &ServiceKey) -> Result<Vec<Service>, DumpError>;
}

/// The on-disk shape of a [`Service`], in the native "discovery" dialect.
///
/// `discovery_core` stays free of `serde` (see the workspace notes), so the
/// wire/disk shape lives here instead and converts to/from `Service` at the
/// crate boundary, the same way `RemoteEntry`/`to_service` do for reads from
/// the remote registry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

impl From<&Service> for ServiceRecord {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.clone(),
            name: service.name.clone(),
            ip: service.ip.clone(),
            port: service.port,
            weight: service.weight,
            tags: service.tags.clone(),
            meta: service.meta.clone(),
        }
    }
}

impl From<ServiceRecord> for Service {
    fn from(record: ServiceRecord) -> Self {
        let mut service = Service::new(record.name, record.port);
        service.id = record.id;
        service.ip = record.ip;
        service.weight = record.weight;
        service.tags = record.tags;
        service.meta = record.meta;
        service
    }
}
