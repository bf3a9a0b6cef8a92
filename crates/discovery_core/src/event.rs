//! Adapter lifecycle events: degrade/recover notifications driven by the
//! façade, consumed by an adapter's dump coordinator.

/// Signals an adapter's health transition. Transitions are idempotent —
/// notifying `Degrade` twice in a row has the same effect as notifying it
/// once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The façade judged this adapter's last answer fallback-worthy.
    Degrade,
    /// The façade judged this adapter's last answer healthy again.
    Recover,
}
