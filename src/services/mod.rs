pub mod ledger;
pub mod stock;
pub mod warehouses;
