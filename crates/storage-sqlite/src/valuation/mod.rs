mod repository;

pub use repository::SecurityValueRepository;
