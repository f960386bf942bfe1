pub mod allocation_model;
pub mod allocation_service;
pub mod allocation_traits;
pub mod scoring;

pub use allocation_model::{
    AllocationState, AllocationTarget, CandidateScore, DriftFlag, MarketIndicators, TrimCandidate,
};
pub use allocation_service::AllocationService;
pub use allocation_traits::{AllocationRepositoryTrait, AllocationServiceTrait};
