//! Inventory domain module (event-sourced stock, plain reference data).
//!
//! This crate contains business rules for the warehouse, implemented purely as
//! deterministic domain logic (no IO, no storage, no locking).

pub mod category;
pub mod item;
pub mod quantity;
pub mod range;
pub mod stock;
pub mod supplier;
pub mod timestamp;
pub mod unit;

pub use category::{Category, NewCategory};
pub use item::{Item, ItemFilter, NewItem};
pub use quantity::Quantity;
pub use range::DateRange;
pub use stock::{
    IssueStock, MovementDirection, ReceiveStock, StockCommand, StockInEvent, StockItem,
    StockMovementEvent, StockOutEvent, STOCK_AGGREGATE_TYPE,
};
pub use supplier::{NewSupplier, Supplier};
pub use timestamp::{LocalInstant, TimestampNormalizer, parse_utc_offset};
pub use unit::Unit;
