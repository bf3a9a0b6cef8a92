//! Hostname-derived defaults: the default `zone` metadata and default
//! service IDs both depend on `HOSTNAME`, read once and injectable in tests.

use std::sync::OnceLock;

/// Injectable source of the local hostname, so tests never depend on the
/// real `HOSTNAME` environment variable.
pub trait HostnameSource {
    fn hostname(&self) -> String;
}

/// Default fallback hostname when the environment variable is unset or the
/// OS call fails, mirroring the upstream registry's fallback.
pub const DEFAULT_HOSTNAME: &str = "default";

/// Reads `HOSTNAME` once per process and caches the result.
#[derive(Debug, Default)]
pub struct EnvHostname;

impl HostnameSource for EnvHostname {
    fn hostname(&self) -> String {
        static CACHED: OnceLock<String> = OnceLock::new();
        CACHED
            .get_or_init(|| {
                std::env::var("HOSTNAME").unwrap_or_else(|_| DEFAULT_HOSTNAME.to_string())
            })
            .clone()
    }
}

/// A fixed hostname, for tests.
#[derive(Debug, Clone)]
pub struct StaticHostname(String);

impl StaticHostname {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self(hostname.into())
    }
}

impl HostnameSource for StaticHostname {
    fn hostname(&self) -> String {
        self.0.clone()
    }
}

/// Default `zone` metadata value: the first `-`-separated token of the
/// hostname.
pub fn default_zone(hostname: &str) -> String {
    hostname.split('-').next().unwrap_or(hostname).to_string()
}
