pub mod ledger_model;
pub mod ledger_service;
pub mod ledger_traits;
pub mod lot_resolver;

pub use ledger_model::*;
pub use ledger_service::LedgerService;
pub use ledger_traits::{LedgerServiceTrait, TransactionRepositoryTrait};

#[cfg(test)]
pub(crate) mod ledger_service_tests;
