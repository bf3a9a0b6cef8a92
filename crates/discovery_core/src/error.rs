//! The public error surface shared by both crates.
//!
//! `DegradePass` is deliberately not a variant here — it is strictly internal
//! to the degrader (see [`crate::degrade::DegradePass`]) and must never cross
//! this boundary.

/// Errors surfaced to callers of the discovery library.
#[derive(Debug, Clone)]
pub enum DiscoveryError {
    /// Malformed input: an invalid key, health-check kind, or dumper format.
    Argument(String),
    /// The requested key has no known entries, in cache or on disk.
    NotFound,
    /// A transport or filesystem error, already retried within its own
    /// subsystem's bounded policy.
    Io(String),
}

impl std::fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Argument(msg) => write!(f, "argument error: {msg}"),
            Self::NotFound => write!(f, "not found"),
            Self::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for DiscoveryError {}

impl DiscoveryError {
    /// True for the specific "absent, try the next source" case the façade
    /// treats as a fallback signal rather than a hard failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
