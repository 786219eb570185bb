use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use warehouse_core::{DomainResult, Entity, ItemId};
use warehouse_inventory::{DateRange, MovementDirection};

use super::{Lookup, ReportEngine, MISSING};
use crate::event_store::EventStore;
use crate::registry::RegistryStore;

/// Per-item movement totals over a range, next to the item's current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMovementSummary {
    pub item_id: ItemId,
    pub item_name: String,
    pub category: String,
    pub unit: String,
    pub total_in: i128,
    pub total_out: i128,
    /// `total_in - total_out` within the range.
    pub net: i128,
    pub current_stock: i64,
}

impl<S, R> ReportEngine<S, R>
where
    S: EventStore,
    R: RegistryStore,
{
    /// One line per active item plus any deactivated item that moved in
    /// `range`, ordered by item name.
    pub fn stock_summary(&self, range: &DateRange) -> DomainResult<Vec<ItemMovementSummary>> {
        let lookup = Lookup::load(&self.registry)?;

        let mut totals: BTreeMap<ItemId, (i128, i128)> = lookup
            .items
            .values()
            .filter(|item| item.is_active())
            .map(|item| (item.id_typed(), (0, 0)))
            .collect();
        for event in self.movements(range)? {
            let entry = totals.entry(event.item_id()).or_default();
            match event.direction() {
                MovementDirection::In => entry.0 += i128::from(event.quantity().get()),
                MovementDirection::Out => entry.1 += i128::from(event.quantity().get()),
            }
        }

        let mut lines: Vec<ItemMovementSummary> = totals
            .into_iter()
            .map(|(item_id, (total_in, total_out))| {
                let item = lookup.items.get(&item_id);
                ItemMovementSummary {
                    item_id,
                    item_name: item.map_or_else(|| MISSING.to_string(), |i| i.name().to_string()),
                    category: lookup.category_name(item),
                    unit: item.map_or_else(|| MISSING.to_string(), |i| i.unit().as_str().to_string()),
                    total_in,
                    total_out,
                    net: total_in - total_out,
                    current_stock: item.map_or(0, |i| i.current_stock()),
                }
            })
            .collect();
        lines.sort_by(|a, b| a.item_name.cmp(&b.item_name).then_with(|| a.item_id.cmp(&b.item_id)));
        Ok(lines)
    }
}
