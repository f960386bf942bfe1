mod repository;

pub use repository::AllocationRepository;
