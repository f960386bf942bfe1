mod repository;

pub use repository::TransactionRepository;
