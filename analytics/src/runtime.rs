//! Runtime wiring
//!
//! Builds the orchestrator, its scheduler and the cache sweeper once and
//! hands out shared references. There is no global instance: the owner
//! holds the runtime and passes handles to whoever needs them.

use std::sync::Arc;

use farmstats_shared::logging::{log_shutdown, log_startup, log_success};
use farmstats_shared::{component_debug, component_error, component_info, AnalyticsConfig, Component};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AnalyticsResult;
use crate::orchestrator::{AnalysisOrchestrator, DASHBOARD_COMPARISONS, DASHBOARD_TRENDS};
use crate::services::{CacheStore, TaskScheduler};
use crate::traits::SnapshotProvider;
use crate::types::{WorkItem, WorkKind};

/// Background task plus the sender that stops it
struct BackgroundTask {
    name: &'static str,
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct AnalyticsRuntime<P>
where
    P: SnapshotProvider + 'static,
{
    orchestrator: Arc<AnalysisOrchestrator<P>>,
    scheduler: Arc<TaskScheduler<AnalysisOrchestrator<P>>>,
    tasks: Vec<BackgroundTask>,
}

impl<P> AnalyticsRuntime<P>
where
    P: SnapshotProvider + 'static,
{
    pub fn new(provider: Arc<P>, config: &AnalyticsConfig) -> AnalyticsResult<Self> {
        let orchestrator = Arc::new(AnalysisOrchestrator::new(provider, config)?);
        let scheduler = Arc::new(TaskScheduler::new(Arc::clone(&orchestrator), config.scheduler.clone())?);

        Ok(Self {
            orchestrator,
            scheduler,
            tasks: Vec::new(),
        })
    }

    pub fn orchestrator(&self) -> Arc<AnalysisOrchestrator<P>> {
        Arc::clone(&self.orchestrator)
    }

    pub fn scheduler(&self) -> Arc<TaskScheduler<AnalysisOrchestrator<P>>> {
        Arc::clone(&self.scheduler)
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Spawn the scheduler tick loop and the cache sweeper. No-op if running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        log_startup(Component::Runtime, "analytics runtime");

        let (scheduler_tx, scheduler_rx) = mpsc::channel(1);
        self.tasks.push(BackgroundTask {
            name: "scheduler",
            shutdown: scheduler_tx,
            handle: TaskScheduler::spawn(Arc::clone(&self.scheduler), scheduler_rx),
        });

        let (sweeper_tx, sweeper_rx) = mpsc::channel(1);
        self.tasks.push(BackgroundTask {
            name: "cache sweeper",
            shutdown: sweeper_tx,
            handle: CacheStore::spawn_sweeper(self.orchestrator.cache(), sweeper_rx),
        });

        log_success(Component::Runtime, "scheduler and cache sweeper running");
    }

    /// Queue a background refresh of every dashboard section, then the
    /// dashboard itself. Returns the number of queued items.
    pub fn schedule_refresh(&self) -> usize {
        let items: Vec<WorkItem> = DASHBOARD_TRENDS
            .into_iter()
            .map(|kind| WorkItem::new(WorkKind::Trend(kind)))
            .chain(
                DASHBOARD_COMPARISONS
                    .into_iter()
                    .map(|kind| WorkItem::new(WorkKind::Comparison(kind))),
            )
            .chain(std::iter::once(WorkItem::new(WorkKind::Dashboard)))
            .collect();

        let queued = items.len();
        self.scheduler.enqueue_many(items);
        component_debug!(Component::Runtime, queued, "🔄 Scheduled dashboard refresh");
        queued
    }

    /// The underlying data moved on (a new in-game day, a reload): drop every
    /// cached result and queue a refresh
    pub async fn snapshot_changed(&self) -> usize {
        let removed = self.orchestrator.invalidate(None).await;
        component_info!(Component::Runtime, removed, "📅 Snapshot changed, cache cleared");
        self.schedule_refresh()
    }

    /// Stop background tasks and wait for them to finish
    pub async fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            // A closed channel means the task already ended
            let _ = task.shutdown.send(()).await;
            if let Err(e) = task.handle.await {
                component_error!(Component::Runtime, error = %e, "❌ {} task ended abnormally", task.name);
            }
        }
        log_shutdown(Component::Runtime, "analytics runtime stopped");
    }
}
