//! File-backed [`Dumper`]: one JSON file per key, written with an
//! atomic-rename so a reader never observes a half-written file.
//!
//! Grounded on `store/ledger.rs`'s durable-write discipline (create the
//! parent directory, use `serde_json`, flush before closing), generalized
//! from append-only JSONL to whole-file atomic replace because the dumper's
//! contract is idempotent overwrite, not an append log.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Deserialize;

use discovery_core::service::{Service, ServiceKey};

use super::{DumpDialect, DumpError, Dumper, ServiceRecord};

/// A file-per-key dumper rooted at a directory. `dialect` controls how
/// `load` interprets an existing file; `store` always writes the native
/// `Service` JSON shape, since it only ever receives services the library
/// itself produced.
pub struct FileDumper {
    dir: PathBuf,
    dialect: DumpDialect,
}

impl FileDumper {
    pub fn new(dir: impl Into<PathBuf>, dialect: DumpDialect) -> Self {
        Self {
            dir: dir.into(),
            dialect,
        }
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o755);
            fs::set_permissions(&self.dir, perms)?;
        }
        Ok(())
    }

    fn path_for(&self, key: &ServiceKey) -> PathBuf {
        self.dir.join(key.to_string())
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let tmp_path = path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(data)?;
            tmp.flush()?;
            tmp.sync_all()?;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o666))?;
        }
        fs::rename(&tmp_path, path)
    }
}

impl Dumper for FileDumper {
    fn last_modify(&self, key: &ServiceKey) -> Result<SystemTime, DumpError> {
        if self.ensure_dir().is_err() {
            return Ok(SystemTime::now());
        }
        let path = self.path_for(key);
        match fs::metadata(&path) {
            Ok(meta) => meta.modified().map_err(|e| DumpError::Io(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DumpError::NotFound),
            // Any other stat error suppresses further throttled writes for
            // this key by reporting "now".
            Err(_) => Ok(SystemTime::now()),
        }
    }

    fn store(&self, key: &ServiceKey, services: &[Service]) -> Result<(), DumpError> {
        self.ensure_dir().map_err(|e| DumpError::Io(e.to_string()))?;
        let path = self.path_for(key);
        let records: Vec<ServiceRecord> = services.iter().map(ServiceRecord::from).collect();
        let data = serde_json::to_vec(&records).map_err(|e| DumpError::Io(e.to_string()))?;
        self.write_atomic(&path, &data).map_err(|e| DumpError::Io(e.to_string()))
    }

    fn load(&self, key: &ServiceKey) -> Result<Vec<Service>, DumpError> {
        let path = self.path_for(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(DumpError::NotFound),
            Err(e) => return Err(DumpError::Io(e.to_string())),
        };

        match self.dialect {
            DumpDialect::Discovery => {
                let records: Vec<ServiceRecord> =
                    serde_json::from_slice(&data).map_err(|e| DumpError::Io(e.to_string()))?;
                Ok(records.into_iter().map(Service::from).collect())
            }
            DumpDialect::Consul => load_consul_dialect(&data, key),
        }
    }
}

/// The on-disk shape of a `/v1/health/service/<name>` dump: an array of
/// `{"Service": {...}}` envelopes, matching the remote registry's wire
/// format.
#[derive(Debug, Deserialize)]
struct ConsulDumpEntry {
    #[serde(rename = "Service")]
    service: Option<ConsulServiceRecord>,
}

#[derive(Debug, Deserialize)]
struct ConsulServiceRecord {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Tags", default)]
    tags: Vec<String>,
    #[serde(rename = "Meta", default)]
    meta: std::collections::HashMap<String, String>,
    #[serde(rename = "Weights", default)]
    weights: ConsulWeights,
}

#[derive(Debug, Default, Deserialize)]
struct ConsulWeights {
    #[serde(rename = "Passing", default)]
    passing: i32,
}

fn load_consul_dialect(data: &[u8], key: &ServiceKey) -> Result<Vec<Service>, DumpError> {
    let entries: Vec<ConsulDumpEntry> =
        serde_json::from_slice(data).map_err(|e| DumpError::Io(e.to_string()))?;

    let mut services = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(record) = entry.service else {
            continue;
        };
        let mut service = Service::new(key.name.clone(), record.port);
        service.id = record.id;
        service.ip = record.address;
        service.tags = record.tags;
        service.meta = record.meta;
        if record.weights.passing > 0 {
            service.weight = record.weights.passing;
        }
        services.push(service);
    }

    if services.is_empty() {
        return Err(DumpError::NotFound);
    }

    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str) -> Service {
        let mut svc = Service::new("cart", 8080);
        svc.id = id.to_string();
        svc.ip = "10.0.0.1".to_string();
        svc
    }

    #[test]
    fn last_modify_reports_not_found_for_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dumper = FileDumper::new(tmp.path(), DumpDialect::Discovery);
        let key = ServiceKey::new("cart", &[], "");
        assert!(matches!(dumper.last_modify(&key), Err(DumpError::NotFound)));
    }

    #[test]
    fn store_then_load_round_trips_discovery_dialect() {
        let tmp = tempfile::tempdir().unwrap();
        let dumper = FileDumper::new(tmp.path(), DumpDialect::Discovery);
        let key = ServiceKey::new("cart", &[], "");
        dumper.store(&key, &[service("a"), service("b")]).unwrap();
        let loaded = dumper.load(&key).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(dumper.last_modify(&key).is_ok());
    }

    #[test]
    fn store_overwrites_atomically() {
        let tmp = tempfile::tempdir().unwrap();
        let dumper = FileDumper::new(tmp.path(), DumpDialect::Discovery);
        let key = ServiceKey::new("cart", &[], "");
        dumper.store(&key, &[service("a")]).unwrap();
        dumper.store(&key, &[service("b"), service("c")]).unwrap();
        let loaded = dumper.load(&key).unwrap();
        assert_eq!(loaded.len(), 2);
        let leftover_tmp_files = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(leftover_tmp_files, 0);
    }

    #[test]
    fn consul_dialect_takes_name_from_key_and_weight_from_weights_passing() {
        let tmp = tempfile::tempdir().unwrap();
        let dumper = FileDumper::new(tmp.path(), DumpDialect::Consul);
        let key = ServiceKey::new("cart", &[], "");
        let path = tmp.path().join(key.to_string());
        std::fs::create_dir_all(tmp.path()).unwrap();
        std::fs::write(
            &path,
            r#"[{"Service":{"ID":"cart-1","Address":"10.0.0.9","Port":9000,"Tags":[],"Meta":{},"Weights":{"Passing":42,"Warning":42}}}]"#,
        )
        .unwrap();
        let loaded = dumper.load(&key).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "cart");
        assert_eq!(loaded[0].weight, 42);
    }
}
