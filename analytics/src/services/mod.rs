//! Service implementations
//!
//! Stateful runtime pieces: the cache, the scheduler and the snapshot
//! providers. Pure analysis logic lives in `core`.

pub mod cache_store;
pub mod snapshot_source;
pub mod task_scheduler;

#[cfg(test)]
mod tests;

pub use cache_store::{CacheStatistics, CacheStore};
pub use snapshot_source::{FileSnapshotProvider, SyntheticSnapshotProvider};
pub use task_scheduler::{CycleOutcome, SchedulerStats, TaskScheduler};
