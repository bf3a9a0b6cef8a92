//! [`Service`]: an addressable, registrable endpoint.

use std::collections::HashMap;

use crate::error::DiscoveryError;
use crate::hostname::HostnameSource;

/// Default weight applied to a service with no explicit weight.
pub const DEFAULT_SERVICE_WEIGHT: i32 = 100;

/// Resolves network addresses the [`Service`] defaulting logic needs but
/// cannot compute itself without I/O: an interface-template lookup and a
/// private-IPv4 fallback. Injected so `discovery_core` stays free of I/O.
pub trait AddressResolver {
    /// Resolve an interface-selector template (e.g. `"{{GetInterfaceIP
    /// \"eth0\"}}"`) to a concrete address, if possible.
    fn resolve_template(&self, template: &str) -> Option<String>;
    /// The first private IPv4 address found on any local interface.
    fn first_private_ipv4(&self) -> Option<String>;
}

/// An addressable endpoint. Identity derives from `id`; two entries with
/// equal `id` are duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub ip_template: Option<String>,
    pub port: u16,
    pub weight: i32,
    pub tags: Vec<String>,
    pub meta: HashMap<String, String>,
    defaults_filled: bool,
}

impl Service {
    /// Construct a new, not-yet-defaulted service. `id`, `ip`, and `meta`
    /// acquire their final values the first time [`Service::fill_defaults`]
    /// runs.
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            ip: String::new(),
            ip_template: None,
            port,
            weight: 0,
            tags: Vec::new(),
            meta: HashMap::new(),
            defaults_filled: false,
        }
    }

    /// Fill `id`, `ip`, and `meta` with their defaults, exactly once.
    /// Calling this more than once is a no-op, matching the one-shot
    /// defaulting semantics of a registration-time service value.
    pub fn fill_defaults(&mut self, addresses: &dyn AddressResolver, hostname: &dyn HostnameSource) {
        if self.defaults_filled {
            return;
        }
        self.defaults_filled = true;

        if self.ip.is_empty() {
            if let Some(template) = &self.ip_template {
                if let Some(resolved) = addresses.resolve_template(template) {
                    self.ip = resolved;
                }
            }
            if self.ip.is_empty() {
                if let Some(resolved) = addresses.first_private_ipv4() {
                    self.ip = resolved;
                }
            }
        }

        if self.id.is_empty() {
            let hostname = hostname.hostname();
            self.id = format!("{}~{}~{}", self.name, self.ip, hostname);
        }
    }

    /// `ip:port`, after defaults have been filled.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Validate that defaulting produced a usable registration: a non-empty
    /// `ip` is mandatory once defaulting has run.
    pub fn validate_for_registration(&self) -> Result<(), DiscoveryError> {
        if self.ip.is_empty() {
            return Err(DiscoveryError::Argument(format!(
                "service {:?} has no resolvable IP address",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hostname::StaticHostname;

    struct FixedAddresses {
        private_ipv4: Option<String>,
    }

    impl AddressResolver for FixedAddresses {
        fn resolve_template(&self, _template: &str) -> Option<String> {
            None
        }
        fn first_private_ipv4(&self) -> Option<String> {
            self.private_ipv4.clone()
        }
    }

    #[test]
    fn fill_defaults_derives_id_from_name_ip_hostname() {
        let mut svc = Service::new("cart", 8080);
        let addrs = FixedAddresses {
            private_ipv4: Some("10.0.0.5".to_string()),
        };
        let host = StaticHostname::new("worker-1");
        svc.fill_defaults(&addrs, &host);
        assert_eq!(svc.ip, "10.0.0.5");
        assert_eq!(svc.id, "cart~10.0.0.5~worker-1");
    }

    #[test]
    fn fill_defaults_is_idempotent() {
        let mut svc = Service::new("cart", 8080);
        svc.id = "explicit-id".to_string();
        let addrs = FixedAddresses {
            private_ipv4: Some("10.0.0.5".to_string()),
        };
        let host = StaticHostname::new("worker-1");
        svc.fill_defaults(&addrs, &host);
        svc.ip = "changed-after-fill".to_string();
        svc.fill_defaults(&addrs, &host);
        assert_eq!(svc.id, "explicit-id");
    }

    #[test]
    fn validate_rejects_unresolved_ip() {
        let svc = Service::new("cart", 8080);
        assert!(svc.validate_for_registration().is_err());
    }
}
