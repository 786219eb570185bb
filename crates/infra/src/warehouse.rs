//! Wiring: one store, one registry, and the services built on them.

use std::sync::Arc;

use tracing::info;

use warehouse_core::DomainResult;

use crate::config::WarehouseConfig;
use crate::event_store::{EventStore, InMemoryEventStore};
use crate::ledger::StockLedger;
use crate::monitor::LowStockMonitor;
use crate::registry::{InMemoryRegistryStore, ItemRegistry, RegistryStore};
use crate::reporting::ReportEngine;

/// Every service shares the same event store and registry store.
#[derive(Debug)]
pub struct Warehouse<S, R> {
    config: WarehouseConfig,
    registry: ItemRegistry<Arc<R>>,
    ledger: StockLedger<Arc<S>, Arc<R>>,
    monitor: LowStockMonitor<Arc<R>>,
    reports: ReportEngine<Arc<S>, Arc<R>>,
}

pub type InMemoryWarehouse = Warehouse<InMemoryEventStore, InMemoryRegistryStore>;

impl<S, R> Warehouse<S, R>
where
    S: EventStore,
    R: RegistryStore,
{
    pub fn new(events: S, records: R, config: WarehouseConfig) -> DomainResult<Self> {
        let events = Arc::new(events);
        let registry = ItemRegistry::new(Arc::new(records));
        let normalizer = config.normalizer();

        let ledger = StockLedger::new(
            Arc::clone(&events),
            registry.clone(),
            normalizer,
            config.max_conflict_retries,
        )?;
        let monitor = LowStockMonitor::new(registry.clone());
        let reports = ReportEngine::new(events, registry.clone(), normalizer)
            .with_dashboard_limits(config.dashboard_low_stock_limit, config.dashboard_recent_activity_limit);

        info!(
            reporting_offset = %config.reporting_offset,
            max_conflict_retries = config.max_conflict_retries,
            "warehouse initialized"
        );
        Ok(Self {
            config,
            registry,
            ledger,
            monitor,
            reports,
        })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn registry(&self) -> &ItemRegistry<Arc<R>> {
        &self.registry
    }

    pub fn ledger(&self) -> &StockLedger<Arc<S>, Arc<R>> {
        &self.ledger
    }

    pub fn monitor(&self) -> &LowStockMonitor<Arc<R>> {
        &self.monitor
    }

    pub fn reports(&self) -> &ReportEngine<Arc<S>, Arc<R>> {
        &self.reports
    }
}

impl InMemoryWarehouse {
    /// Empty in-memory warehouse (tests, demos).
    pub fn in_memory(config: WarehouseConfig) -> DomainResult<Self> {
        Self::new(InMemoryEventStore::new(), InMemoryRegistryStore::new(), config)
    }
}
