//! SeaORM entities owned exclusively by the stock engine.
//!
//! Stock rows are never mutated by callers directly; every write goes through
//! one of the commands in [`crate::commands::inventory`].

pub mod stock_adjustment;
pub mod stock_item;
pub mod stock_ledger;
pub mod stock_reservation;
pub mod stock_transfer;
pub mod warehouse;

pub use stock_adjustment::Entity as StockAdjustment;
pub use stock_item::Entity as StockItem;
pub use stock_ledger::Entity as StockLedger;
pub use stock_reservation::Entity as StockReservation;
pub use stock_transfer::Entity as StockTransfer;
pub use warehouse::Entity as Warehouse;
