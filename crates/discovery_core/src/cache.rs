//! Concurrent `ServiceKey -> Vec<Service>` cache, the in-memory heart of a
//! discovery adapter.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::service::{Service, ServiceKey};

/// A concurrent map from [`ServiceKey`] to its current endpoint slice.
///
/// Writes replace the whole slice atomically: a reader always observes
/// either the pre-`set` or the post-`set` slice, never a torn mix, because
/// each slot holds an `Arc<Vec<Service>>` and `set` only ever swaps the
/// `Arc`, never mutates through it.
#[derive(Debug, Default)]
pub struct ServiceCache {
    entries: RwLock<HashMap<ServiceKey, Arc<Vec<Service>>>>,
}

impl ServiceCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up the current slice for `key`, if any has ever been set.
    pub fn get(&self, key: &ServiceKey) -> Option<Arc<Vec<Service>>> {
        self.entries
            .read()
            .expect("service cache lock poisoned")
            .get(key)
            .cloned()
    }

    /// Replace the whole slice for `key`. Idempotent: calling with the same
    /// services again is a no-op from the caller's perspective.
    pub fn set(&self, key: ServiceKey, services: Vec<Service>) {
        self.entries
            .write()
            .expect("service cache lock poisoned")
            .insert(key, Arc::new(services));
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries.read().expect("service cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str) -> Service {
        let mut svc = Service::new("cart", 8080);
        svc.id = id.to_string();
        svc
    }

    #[test]
    fn miss_returns_none() {
        let cache = ServiceCache::new();
        let key = ServiceKey::new("cart", &[], "");
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = ServiceCache::new();
        let key = ServiceKey::new("cart", &[], "");
        cache.set(key.clone(), vec![service("a"), service("b")]);
        let got = cache.get(&key).unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn set_replaces_wholesale() {
        let cache = ServiceCache::new();
        let key = ServiceKey::new("cart", &[], "");
        cache.set(key.clone(), vec![service("a"), service("b")]);
        cache.set(key.clone(), vec![service("c")]);
        let got = cache.get(&key).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "c");
    }
}
