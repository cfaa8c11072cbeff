//! Trait definitions with mockall annotations for testing
//!
//! These are the seams between the analysis pipeline and the outside world:
//! where snapshots come from, what the scheduler runs, and what a consumer
//! reads. Each one has a generated `Mock*` for tests.

use std::sync::Arc;

use farmstats_shared::FarmSnapshot;

use crate::error::AnalyticsResult;
use crate::types::{Dashboard, PerformanceStats, WorkItem, WorkPayload};

/// Source of raw farm statistics.
///
/// Implemented by whatever adapter sits next to the game state. Each call
/// returns a fresh snapshot; the orchestrator decides how often to ask.
#[mockall::automock]
#[async_trait::async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn collect_snapshot(&self) -> AnalyticsResult<FarmSnapshot>;
}

/// Executes one queued work item on behalf of the scheduler
#[mockall::automock]
#[async_trait::async_trait]
pub trait WorkExecutor: Send + Sync {
    /// Run `item` to completion.
    ///
    /// An error fails only this item; the rest of the batch keeps going.
    async fn execute(&self, item: &WorkItem) -> AnalyticsResult<WorkPayload>;
}

/// Read side used by a presentation layer
#[mockall::automock]
#[async_trait::async_trait]
pub trait AnalysisConsumer: Send + Sync {
    /// Latest dashboard. Never fails; broken sections become placeholders.
    async fn dashboard(&self) -> Arc<Dashboard>;

    /// Drop cached results whose key starts with `prefix`, or all of them
    async fn invalidate(&self, prefix: Option<String>) -> usize;

    async fn performance_stats(&self) -> PerformanceStats;
}
