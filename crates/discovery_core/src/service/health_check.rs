//! Health check declarations attached to a [`super::Service`] registration.

use std::time::Duration;

/// Minimum allowed poll interval; anything shorter is clamped up to this.
const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCheckKind {
    Http,
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Passing,
    Critical,
}

/// A single health check the registry should run against a registered
/// service.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub kind: HealthCheckKind,
    pub name: String,
    pub uri: String,
    /// HTTP method; only meaningful for [`HealthCheckKind::Http`].
    pub method: Option<String>,
    /// HTTP headers; only meaningful for [`HealthCheckKind::Http`].
    pub header: Option<std::collections::HashMap<String, Vec<String>>>,
    interval: Duration,
    pub status: CheckStatus,
}

impl HealthCheck {
    pub fn new(kind: HealthCheckKind, name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            uri: uri.into(),
            method: None,
            header: None,
            interval: MIN_CHECK_INTERVAL,
            status: CheckStatus::Passing,
        }
    }

    /// Interval at which the registry polls this check, clamped to at least
    /// one second.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_CHECK_INTERVAL);
        self
    }
}
