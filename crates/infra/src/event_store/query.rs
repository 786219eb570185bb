//! Read-side filters over the event store.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use warehouse_core::ItemId;

use super::StoredEvent;

/// Pagination parameters for row listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for event queries. Time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub aggregate_id: Option<ItemId>,
    /// e.g. "inventory.stock"
    pub aggregate_type: Option<String>,
    /// e.g. "inventory.stock.issued"
    pub event_type: Option<String>,
    pub occurred_from: Option<DateTime<FixedOffset>>,
    pub occurred_until: Option<DateTime<FixedOffset>>,
}

impl EventFilter {
    pub fn matches(&self, event: &StoredEvent) -> bool {
        if self.aggregate_id.is_some_and(|id| id != event.aggregate_id) {
            return false;
        }
        if self
            .aggregate_type
            .as_deref()
            .is_some_and(|t| t != event.aggregate_type)
        {
            return false;
        }
        if self.event_type.as_deref().is_some_and(|t| t != event.event_type) {
            return false;
        }
        if self.occurred_from.is_some_and(|from| event.occurred_at < from) {
            return false;
        }
        if self.occurred_until.is_some_and(|until| event.occurred_at > until) {
            return false;
        }
        true
    }
}
