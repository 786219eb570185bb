use chrono::{DateTime, FixedOffset};

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts; corrections are new events)
/// - **versioned** (schema evolution)
/// - designed to be **append-only**
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "inventory.stock.received").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time, canonical store offset).
    fn occurred_at(&self) -> DateTime<FixedOffset>;
}
