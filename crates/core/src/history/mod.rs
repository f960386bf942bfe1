pub mod history_model;
pub mod history_service;
pub mod history_traits;
pub mod wma;

pub use history_model::HistoricalSnapshot;
pub use history_service::HistoryService;
pub use history_traits::{HistoryServiceTrait, HistorySnapshotRepositoryTrait};
