//! Stockroom — multi-warehouse stock reservation and allocation engine.
//!
//! The crate tracks physical stock per (tenant, warehouse, variant), reserves
//! stock against order lines, releases or consumes those reservations, applies
//! operator adjustments and warehouse-to-warehouse transfers, and records every
//! quantity change in an append-only ledger.
//!
//! All mutating operations run inside a single database transaction with
//! row-level locks on every stock row they touch, acquired in ascending
//! warehouse-id order. Callers thread an explicit tenant id through every
//! call; there is no ambient tenant context.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;

pub use errors::ServiceError;
pub use services::stock::StockService;
