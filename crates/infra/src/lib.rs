//! Infrastructure layer: storage, the stock ledger, read-side views, config.

pub mod config;
pub mod event_store;
pub mod ledger;
pub mod monitor;
pub mod registry;
pub mod reporting;
pub mod warehouse;


pub use config::WarehouseConfig;
pub use ledger::{MovementHistory, StockInRequest, StockLedger, StockOutRequest};
pub use monitor::{LowStockItem, LowStockMonitor};
pub use registry::{InMemoryRegistryStore, ItemListing, ItemRegistry, RegistryStore};
pub use reporting::{DashboardStats, MovementReport, ReportEngine, ReportFilter, ReportPage};
pub use warehouse::{InMemoryWarehouse, Warehouse};
