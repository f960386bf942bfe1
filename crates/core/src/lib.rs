//! Lotfolio Core - Tax-lot ledger and valuation engine.
//!
//! This crate contains the domain logic: the append-mostly transaction
//! ledger, FIFO/specific-lot relief, deterministic per-symbol valuation
//! replay, portfolio history aggregation, allocation drift tracking, and
//! the dividend forecaster. It is database-agnostic and defines traits
//! that are implemented by the `storage-sqlite` crate.

pub mod allocation;
pub mod constants;
pub mod dividends;
pub mod errors;
pub mod history;
pub mod ledger;
pub mod quotes;
pub mod settings;
pub mod tasks;
pub mod utils;
pub mod valuation;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
