//! `orderflow-stock` — the stock ledger.
//!
//! Authoritative, concurrency-safe store of per-product available quantity.
//! Reservation and release of stock go through this crate and nowhere else.

pub mod ledger;

pub use ledger::{InMemoryStockLedger, StockLedger, StockRecord};
