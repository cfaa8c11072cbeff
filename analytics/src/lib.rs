//! Farm statistics analytics core
//!
//! Turns raw farm snapshots into cached, scored analysis: trend fits,
//! benchmark comparisons and a composite dashboard. Background refreshes run
//! on a batched scheduler; results are served read-through from a TTL cache.

pub mod core;
pub mod error;
pub mod orchestrator;
pub mod runtime;
pub mod services;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use crate::core::{ComparisonEngine, FarmMetrics, TrendEngine};
pub use error::{AnalyticsError, AnalyticsResult};
pub use orchestrator::AnalysisOrchestrator;
pub use runtime::AnalyticsRuntime;
pub use services::{CacheStore, FileSnapshotProvider, SyntheticSnapshotProvider, TaskScheduler};
pub use traits::{AnalysisConsumer, SnapshotProvider, WorkExecutor};
