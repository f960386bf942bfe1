use async_trait::async_trait;

use crate::allocation::allocation_model::{
    AllocationState, AllocationTarget, CandidateScore, MarketIndicators, TrimCandidate,
};
use crate::errors::Result;

/// Storage interface for allocation targets, drift states, and the market
/// indicators the screens read.
#[async_trait]
pub trait AllocationRepositoryTrait: Send + Sync {
    async fn upsert_target(&self, target: AllocationTarget) -> Result<()>;

    async fn get_targets(&self) -> Result<Vec<AllocationTarget>>;

    /// Replaces the stored drift states with the given set.
    async fn save_states(&self, states: Vec<AllocationState>) -> Result<()>;

    async fn get_states(&self) -> Result<Vec<AllocationState>>;

    async fn upsert_indicators(&self, indicators: Vec<MarketIndicators>) -> Result<()>;

    async fn get_indicators(&self) -> Result<Vec<MarketIndicators>>;
}

/// Allocation tracking and candidate screens.
#[async_trait]
pub trait AllocationServiceTrait: Send + Sync {
    async fn set_target(&self, target: AllocationTarget) -> Result<()>;

    /// Recomputes drift for every target from the latest security values
    /// and persists the result.
    async fn refresh_drift(&self) -> Result<Vec<AllocationState>>;

    /// Last persisted drift states.
    async fn get_allocation_drift(&self) -> Result<Vec<AllocationState>>;

    /// Underweight symbols ranked by indicator score, best first.
    async fn buy_candidates(&self) -> Result<Vec<CandidateScore>>;

    /// Profitable lots of overweight positions, highest profit percent
    /// first.
    async fn trim_candidates(&self) -> Result<Vec<TrimCandidate>>;
}
