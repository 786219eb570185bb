use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use warehouse_core::{DomainResult, Entity, EventId};
use warehouse_inventory::{DateRange, MovementDirection, StockMovementEvent};

use super::{Lookup, ReportEngine, MISSING};
use crate::event_store::EventStore;
use crate::monitor::{LowStockItem, LowStockMonitor};
use crate::registry::RegistryStore;

/// One line of the dashboard's activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub event_id: EventId,
    pub direction: MovementDirection,
    /// e.g. `50 Beras masuk dari PT Sumber Pangan`
    pub message: String,
    pub occurred_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub date: NaiveDate,
    pub total_items: usize,
    pub total_categories: usize,
    pub total_suppliers: usize,
    /// Quantity received on `date` (reporting offset).
    pub stock_in_today: i128,
    /// Quantity issued on `date` (reporting offset).
    pub stock_out_today: i128,
    pub low_stock: Vec<LowStockItem>,
    /// Most recent first.
    pub recent_activities: Vec<Activity>,
}

impl Lookup {
    fn activity(&self, event: &StockMovementEvent) -> Activity {
        let item_name = self
            .items
            .get(&event.item_id())
            .map_or(MISSING, |i| i.name());
        let message = match event {
            StockMovementEvent::StockIn(e) => {
                let supplier = self.suppliers.get(&e.supplier_id).map_or(MISSING, |s| s.name());
                format!("{} {item_name} masuk dari {supplier}", e.quantity.get())
            }
            StockMovementEvent::StockOut(e) => {
                format!("{} {item_name} keluar ke {}", e.quantity.get(), e.destination)
            }
        };
        Activity {
            event_id: event.id(),
            direction: event.direction(),
            message,
            occurred_at: warehouse_events::Event::occurred_at(event),
        }
    }
}

impl<S, R> ReportEngine<S, R>
where
    S: EventStore,
    R: RegistryStore + Clone,
{
    /// Dashboard for today in the reporting offset.
    pub fn dashboard(&self) -> DomainResult<DashboardStats> {
        self.dashboard_at(self.normalizer.today())
    }

    pub fn dashboard_at(&self, date: NaiveDate) -> DomainResult<DashboardStats> {
        let lookup = Lookup::load(&self.registry)?;
        let today = self.movements(&DateRange::for_day(date, self.normalizer.reporting_offset())?)?;

        let (mut stock_in_today, mut stock_out_today) = (0i128, 0i128);
        for event in &today {
            let quantity = i128::from(event.quantity().get());
            match event.direction() {
                MovementDirection::In => stock_in_today += quantity,
                MovementDirection::Out => stock_out_today += quantity,
            }
        }

        let low_stock = LowStockMonitor::new(self.registry.clone())
            .find_low_stock(Some(self.low_stock_limit))?
            .iter()
            .map(LowStockItem::from)
            .collect();

        let recent_activities = today
            .iter()
            .rev()
            .take(self.recent_activity_limit)
            .map(|e| lookup.activity(e))
            .collect();

        Ok(DashboardStats {
            date,
            total_items: lookup.items.values().filter(|i| i.is_active()).count(),
            total_categories: lookup.categories.values().filter(|c| c.is_active()).count(),
            total_suppliers: lookup.suppliers.values().filter(|s| s.is_active()).count(),
            stock_in_today,
            stock_out_today,
            low_stock,
            recent_activities,
        })
    }
}
