pub mod recompute;
pub mod task_model;
pub mod task_store;

pub use recompute::RecomputeTask;
pub use task_model::{CancelFlag, TaskState, TaskStatus};
pub use task_store::TaskStatusStore;

#[cfg(test)]
mod task_tests;
