mod repository;

pub use repository::HistorySnapshotRepository;
