mod repository;

pub use repository::QuoteRepository;
