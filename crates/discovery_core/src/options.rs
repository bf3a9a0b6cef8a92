//! Configuration surfaces for the adapter, a single discovery/registration
//! call, and the façade. Each carries the documented default and is built
//! via `with_*` chaining rather than a from-file loader — loading
//! configuration from disk/env is an external concern (see the crate root
//! docs).

use std::collections::HashMap;
use std::time::Duration;

use crate::service::HealthCheck;

pub const DEFAULT_SERVICE_WEIGHT: i32 = 100;
pub const DEFAULT_DEGRADE_THRESHOLD: f64 = 0.8;
pub const DEFAULT_WATCH_WAIT_TIME: Duration = Duration::from_secs(3 * 60);
pub const DEFAULT_WATCH_DUMP_INTERVAL: Duration = Duration::from_secs(3 * 60 * 60);
pub const DEFAULT_WATCH_ROLLING_WINDOW_SIZE: usize = 10;
pub const DEFAULT_CALM_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_RETRY_TIMES: u32 = 3;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
pub const MIN_WATCH_WAIT_TIME: Duration = Duration::from_secs(30);
pub const MAX_WATCH_WAIT_TIME: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_SERVICE_CHECK_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SERVICE_DEREGISTER_CRITICAL_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Recognized adapter-default metadata names, merged into a registration
/// below any caller-supplied metadata of the same name.
pub const DEFAULT_SERVICE_META_CLOUD: &str = "aliyun";
pub const DEFAULT_SERVICE_META_CONTAINER: &str = "vm";
pub const DEFAULT_SERVICE_META_REGISTRY: &str = "consul";

/// Tunables for a `RegistryAdapter`.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    pub stale: bool,
    pub agent_cache: bool,
    pub passing_only: bool,
    /// `0.0` disables the degrader entirely.
    pub threshold: f64,
    pub watch_dump_interval: Duration,
    pub watch_wait_time: Duration,
    pub calm_interval: Duration,
    pub first_fetch_use_catalog: bool,
    pub debug: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            stale: true,
            agent_cache: false,
            passing_only: true,
            threshold: DEFAULT_DEGRADE_THRESHOLD,
            watch_dump_interval: DEFAULT_WATCH_DUMP_INTERVAL,
            watch_wait_time: DEFAULT_WATCH_WAIT_TIME,
            calm_interval: DEFAULT_CALM_INTERVAL,
            first_fetch_use_catalog: false,
            debug: false,
        }
    }
}

impl AdapterOptions {
    /// `watch_wait_time`, clamped to `[30s, 10m]`.
    pub fn clamped_watch_wait_time(&self) -> Duration {
        self.watch_wait_time.clamp(MIN_WATCH_WAIT_TIME, MAX_WATCH_WAIT_TIME)
    }
}

/// Per-call overrides for a discovery lookup.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryCallOptions {
    pub dc: Option<String>,
    pub tags: Vec<String>,
}

/// Per-call overrides for a registration.
#[derive(Debug, Clone, Default)]
pub struct RegistratorCallOptions {
    pub checks: Vec<HealthCheck>,
    pub metadata: HashMap<String, String>,
}

/// How the façade handles an error or partial failure from one of several
/// ordered collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailType {
    /// Keep going through the remaining collaborators, recording the error.
    FailBack,
    /// Stop at the first error.
    FailFast,
}

impl Default for FailType {
    fn default() -> Self {
        Self::FailBack
    }
}
