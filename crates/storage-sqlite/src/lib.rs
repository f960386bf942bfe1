//! SQLite-backed implementations of the core storage traits.
//!
//! One bundled SQLite database holds the ledger, quotes, and all derived
//! state. Repositories here translate between SQL rows and the core
//! domain types; decimals are stored as text to avoid float drift.

pub mod allocation;
pub mod db;
pub mod errors;
pub mod history;
pub mod ledger;
pub mod quotes;
pub mod utils;
pub mod valuation;

pub use allocation::AllocationRepository;
pub use db::SqliteDb;
pub use history::HistorySnapshotRepository;
pub use ledger::TransactionRepository;
pub use quotes::QuoteRepository;
pub use valuation::SecurityValueRepository;
