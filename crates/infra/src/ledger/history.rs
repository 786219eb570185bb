use warehouse_core::ItemId;
use warehouse_inventory::{DateRange, StockMovementEvent};

/// Movement history of one item, ascending by `occurred_at` then event id.
///
/// A snapshot: iterating it never touches the store, and `iter()` can be
/// called again to restart from the first event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementHistory {
    item_id: ItemId,
    range: Option<DateRange>,
    events: Vec<StockMovementEvent>,
}

impl MovementHistory {
    pub(crate) fn new(item_id: ItemId, range: Option<DateRange>, events: Vec<StockMovementEvent>) -> Self {
        Self { item_id, range, events }
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn range(&self) -> Option<&DateRange> {
        self.range.as_ref()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StockMovementEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Net stock effect of the events in this window.
    ///
    /// Widened to `i128`: a window ordered by time can hold large receipts
    /// without the issues that offset them.
    pub fn net_quantity(&self) -> i128 {
        self.events
            .iter()
            .map(|e| i128::from(e.signed_quantity()))
            .sum()
    }
}

impl<'a> IntoIterator for &'a MovementHistory {
    type Item = &'a StockMovementEvent;
    type IntoIter = std::slice::Iter<'a, StockMovementEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
