//! Read-only reports over the movement history.
//!
//! Every report is computed from the event store at call time and joined
//! with the registry for display names. Nothing is cached, so two calls over
//! the same committed state return identical results.

mod dashboard;
mod summary;

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

use warehouse_core::{CategoryId, DomainResult, EventId, ItemId, SupplierId};
use warehouse_inventory::{
    Category, DateRange, Item, MovementDirection, StockMovementEvent, Supplier, TimestampNormalizer,
    STOCK_AGGREGATE_TYPE,
};

use crate::event_store::{EventFilter, EventStore, Pagination};
use crate::ledger::decode;
use crate::registry::{ItemRegistry, RegistryStore};

pub use dashboard::{Activity, DashboardStats};
pub use summary::ItemMovementSummary;

/// Placeholder for a join that no longer resolves.
const MISSING: &str = "-";

/// Narrows a report to some items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub item_id: Option<ItemId>,
    pub category_id: Option<CategoryId>,
    /// Case-insensitive substring of the item name.
    pub item_name_contains: Option<String>,
}

impl ReportFilter {
    fn matches(&self, item_id: ItemId, item: Option<&Item>) -> bool {
        if self.item_id.is_some_and(|id| id != item_id) {
            return false;
        }
        if let Some(category_id) = self.category_id {
            if item.is_none_or(|i| i.category_id() != category_id) {
                return false;
            }
        }
        if let Some(fragment) = &self.item_name_contains {
            let needle = fragment.trim().to_lowercase();
            if item.is_none_or(|i| !i.name().to_lowercase().contains(&needle)) {
                return false;
            }
        }
        true
    }
}

/// Column manifest entry: row field key and its display title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportColumn {
    pub key: String,
    pub title: String,
}

impl ReportColumn {
    fn new(key: &str, title: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
        }
    }
}

/// Columns of a movement report, in display order.
pub fn report_columns(direction: MovementDirection) -> Vec<ReportColumn> {
    let (quantity, date, counterparty) = match direction {
        MovementDirection::In => (
            ReportColumn::new("quantity", "Jumlah Masuk"),
            ReportColumn::new("occurred_at", "Tanggal Masuk"),
            ReportColumn::new("supplier", "Supplier"),
        ),
        MovementDirection::Out => (
            ReportColumn::new("quantity", "Jumlah Keluar"),
            ReportColumn::new("occurred_at", "Tanggal Keluar"),
            ReportColumn::new("destination", "Tujuan"),
        ),
    };
    vec![
        ReportColumn::new("no", "No"),
        ReportColumn::new("item_name", "Nama Barang"),
        ReportColumn::new("category", "Kategori"),
        quantity,
        ReportColumn::new("unit", "Satuan"),
        date,
        counterparty,
        ReportColumn::new("recorded_by", "Petugas"),
    ]
}

/// One movement joined with registry names. Keys match [`report_columns`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub no: usize,
    pub event_id: EventId,
    pub item_id: ItemId,
    pub item_name: String,
    pub category: String,
    pub quantity: i64,
    pub unit: String,
    pub occurred_at: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub recorded_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReport {
    pub direction: MovementDirection,
    pub range: DateRange,
    pub total_transactions: usize,
    /// Summed across items, so wider than any single item's stock.
    pub total_quantity: i128,
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<ReportRow>,
}

/// A page of report rows. Totals cover the whole range, not just the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPage {
    pub direction: MovementDirection,
    pub range: DateRange,
    pub total_transactions: usize,
    pub total_quantity: i128,
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<ReportRow>,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Registry tables loaded once per report.
struct Lookup {
    items: HashMap<ItemId, Item>,
    categories: HashMap<CategoryId, Category>,
    suppliers: HashMap<SupplierId, Supplier>,
}

impl Lookup {
    fn load<R: RegistryStore>(registry: &ItemRegistry<R>) -> DomainResult<Self> {
        let store = registry.store();
        Ok(Self {
            items: store.items()?.into_iter().map(|i| (i.id_typed(), i)).collect(),
            categories: store.categories()?.into_iter().map(|c| (c.id_typed(), c)).collect(),
            suppliers: store.suppliers()?.into_iter().map(|s| (s.id_typed(), s)).collect(),
        })
    }

    fn category_name(&self, item: Option<&Item>) -> String {
        item.and_then(|i| self.categories.get(&i.category_id()))
            .map_or_else(|| MISSING.to_string(), |c| c.name().to_string())
    }

    fn row(&self, no: usize, event: &StockMovementEvent) -> ReportRow {
        let item = self.items.get(&event.item_id());
        let (supplier, destination) = match event {
            StockMovementEvent::StockIn(e) => (
                Some(
                    self.suppliers
                        .get(&e.supplier_id)
                        .map_or_else(|| MISSING.to_string(), |s| s.name().to_string()),
                ),
                None,
            ),
            StockMovementEvent::StockOut(e) => (None, Some(e.destination.clone())),
        };

        ReportRow {
            no,
            event_id: event.id(),
            item_id: event.item_id(),
            item_name: item.map_or_else(|| MISSING.to_string(), |i| i.name().to_string()),
            category: self.category_name(item),
            quantity: event.quantity().get(),
            unit: item.map_or_else(|| MISSING.to_string(), |i| i.unit().as_str().to_string()),
            occurred_at: warehouse_events::Event::occurred_at(event),
            supplier,
            destination,
            recorded_by: event.recorded_by().to_string(),
        }
    }
}

/// Default number of low-stock and recent-activity lines on the dashboard.
pub const DEFAULT_DASHBOARD_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct ReportEngine<S, R> {
    store: S,
    registry: ItemRegistry<R>,
    normalizer: TimestampNormalizer,
    low_stock_limit: usize,
    recent_activity_limit: usize,
}

impl<S, R> ReportEngine<S, R>
where
    S: EventStore,
    R: RegistryStore,
{
    pub fn new(store: S, registry: ItemRegistry<R>, normalizer: TimestampNormalizer) -> Self {
        Self {
            store,
            registry,
            normalizer,
            low_stock_limit: DEFAULT_DASHBOARD_LIMIT,
            recent_activity_limit: DEFAULT_DASHBOARD_LIMIT,
        }
    }

    pub fn with_dashboard_limits(mut self, low_stock: usize, recent_activity: usize) -> Self {
        self.low_stock_limit = low_stock;
        self.recent_activity_limit = recent_activity;
        self
    }

    /// All movements with `occurred_at` in `range` (inclusive), ascending.
    fn movements(&self, range: &DateRange) -> DomainResult<Vec<StockMovementEvent>> {
        let filter = EventFilter {
            aggregate_type: Some(STOCK_AGGREGATE_TYPE.to_string()),
            occurred_from: Some(range.start()),
            occurred_until: Some(range.end()),
            ..EventFilter::default()
        };
        self.store.query(&filter)?.iter().map(decode).collect()
    }

    /// Movement report for one direction over an inclusive range.
    pub fn summarize(
        &self,
        direction: MovementDirection,
        range: &DateRange,
        filter: Option<&ReportFilter>,
    ) -> DomainResult<MovementReport> {
        let lookup = Lookup::load(&self.registry)?;
        let rows: Vec<ReportRow> = self
            .movements(range)?
            .iter()
            .filter(|e| e.direction() == direction)
            .filter(|e| filter.is_none_or(|f| f.matches(e.item_id(), lookup.items.get(&e.item_id()))))
            .enumerate()
            .map(|(idx, e)| lookup.row(idx + 1, e))
            .collect();

        let total_quantity: i128 = rows.iter().map(|r| i128::from(r.quantity)).sum();
        debug!(%direction, rows = rows.len(), total_quantity, "movement report built");

        Ok(MovementReport {
            direction,
            range: *range,
            total_transactions: rows.len(),
            total_quantity,
            columns: report_columns(direction),
            rows,
        })
    }

    /// Same as [`summarize`](Self::summarize) but returns one page of rows.
    pub fn summarize_page(
        &self,
        direction: MovementDirection,
        range: &DateRange,
        filter: Option<&ReportFilter>,
        pagination: Pagination,
    ) -> DomainResult<ReportPage> {
        let report = self.summarize(direction, range, filter)?;
        let pagination = Pagination::new(Some(pagination.limit), Some(pagination.offset));
        let offset = pagination.offset as usize;
        let limit = pagination.limit as usize;

        let has_more = report.rows.len() > offset.saturating_add(limit);
        let rows = report.rows.into_iter().skip(offset).take(limit).collect();

        Ok(ReportPage {
            direction,
            range: report.range,
            total_transactions: report.total_transactions,
            total_quantity: report.total_quantity,
            columns: report.columns,
            rows,
            pagination,
            has_more,
        })
    }
}
