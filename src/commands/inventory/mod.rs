//! Mutating stock operations, one command per engine.
//!
//! Each command validates its input before taking any lock, runs inside a
//! single transaction with row locks acquired in ascending warehouse-id
//! order, writes its ledger rows in that same transaction, and emits a domain
//! event only after commit.

mod stock_txn;

pub mod adjust_stock_command;
pub mod consume_stock_command;
pub mod release_stock_command;
pub mod reserve_stock_command;
pub mod transfer_stock_command;

pub use adjust_stock_command::AdjustStockCommand;
pub use consume_stock_command::ConsumeStockCommand;
pub use release_stock_command::ReleaseStockCommand;
pub use reserve_stock_command::ReserveStockCommand;
pub use transfer_stock_command::TransferStockCommand;
