//! Low-stock monitor: items at or below their reorder threshold.

use serde::{Deserialize, Serialize};
use tracing::debug;

use warehouse_core::{DomainResult, Entity, ItemId};
use warehouse_inventory::{Item, Unit};

use crate::registry::{ItemRegistry, RegistryStore};

/// One low-stock line as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    pub item_id: ItemId,
    pub name: String,
    pub unit: Unit,
    pub current_stock: i64,
    pub reorder_threshold: i64,
}

impl From<&Item> for LowStockItem {
    fn from(item: &Item) -> Self {
        Self {
            item_id: item.id_typed(),
            name: item.name().to_string(),
            unit: item.unit(),
            current_stock: item.current_stock(),
            reorder_threshold: item.reorder_threshold(),
        }
    }
}

/// Reads straight from the registry on every call, so a committed movement is
/// visible to the next query.
#[derive(Debug, Clone)]
pub struct LowStockMonitor<R> {
    registry: ItemRegistry<R>,
}

impl<R: RegistryStore> LowStockMonitor<R> {
    pub fn new(registry: ItemRegistry<R>) -> Self {
        Self { registry }
    }

    /// Active items with `current_stock <= reorder_threshold`, most critical
    /// first (ascending `current_stock - reorder_threshold`, then name, then id).
    pub fn find_low_stock(&self, limit: Option<usize>) -> DomainResult<Vec<Item>> {
        let mut low: Vec<Item> = self
            .registry
            .store()
            .items()?
            .into_iter()
            .filter(|item| item.is_active() && item.is_low_stock())
            .collect();

        low.sort_by(|a, b| {
            a.stock_margin()
                .cmp(&b.stock_margin())
                .then_with(|| a.name().cmp(b.name()))
                .then_with(|| a.id_typed().cmp(&b.id_typed()))
        });
        if let Some(limit) = limit {
            low.truncate(limit);
        }

        debug!(count = low.len(), "low-stock scan");
        Ok(low)
    }
}
