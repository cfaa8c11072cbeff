//! Batched FIFO work scheduler
//!
//! Items queue without blocking the caller. Each tick drains the queue head
//! until the per-cycle item count or time budget runs out; leftovers wait for
//! the next tick. Only one cycle runs at a time: a tick that finds a cycle in
//! progress is skipped, not queued.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use farmstats_shared::{component_debug, component_info, component_warn};
use farmstats_shared::{Component, SchedulerConfig};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::traits::WorkExecutor;
use crate::types::{BatchResult, ItemResult, WorkItem};

/// What a single call to `run_cycle` did
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Another cycle held the queue
    Skipped,
    /// Queue was empty, no event emitted
    Idle,
    Completed(BatchResult),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub cycles_completed: u64,
    pub ticks_skipped: u64,
    pub items_processed: u64,
    pub items_failed: u64,
    pub pending: usize,
}

pub struct TaskScheduler<E>
where
    E: WorkExecutor + 'static,
{
    executor: Arc<E>,
    config: SchedulerConfig,
    queue_tx: mpsc::UnboundedSender<WorkItem>,
    /// Holding this lock is the right to run a cycle
    queue_rx: Mutex<mpsc::UnboundedReceiver<WorkItem>>,
    pending: AtomicUsize,
    events: broadcast::Sender<BatchResult>,
    cycles_completed: AtomicU64,
    ticks_skipped: AtomicU64,
    items_processed: AtomicU64,
    items_failed: AtomicU64,
}

impl<E> TaskScheduler<E>
where
    E: WorkExecutor + 'static,
{
    pub fn new(executor: Arc<E>, config: SchedulerConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity);

        Ok(Self {
            executor,
            config,
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            pending: AtomicUsize::new(0),
            events,
            cycles_completed: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
            items_processed: AtomicU64::new(0),
            items_failed: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Append to the queue tail. Never blocks.
    pub fn enqueue(&self, item: WorkItem) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(rejected) = self.queue_tx.send(item) {
            // Receiver lives as long as self, so this only happens mid-drop
            self.pending.fetch_sub(1, Ordering::SeqCst);
            component_warn!(Component::Scheduler, "Dropped work item {}: queue closed", rejected.0.id);
        }
    }

    pub fn enqueue_many(&self, items: impl IntoIterator<Item = WorkItem>) {
        for item in items {
            self.enqueue(item);
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Receive a `BatchResult` for every non-empty cycle
    pub fn subscribe(&self) -> broadcast::Receiver<BatchResult> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            items_processed: self.items_processed.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            pending: self.pending(),
        }
    }

    /// Drain one batch from the queue head.
    ///
    /// Stops after `max_batch_size` items or once `max_processing_time` has
    /// elapsed, checked between items. A running item is never interrupted.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let mut queue = match self.queue_rx.try_lock() {
            Ok(queue) => queue,
            Err(_) => {
                self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
                component_debug!(Component::Scheduler, "⏭️ Cycle still running, skipping tick");
                return CycleOutcome::Skipped;
            }
        };

        let started = Instant::now();
        let budget = self.config.max_processing_time();
        let mut results = Vec::new();

        while results.len() < self.config.max_batch_size && started.elapsed() < budget {
            let Ok(item) = queue.try_recv() else {
                break;
            };
            self.pending.fetch_sub(1, Ordering::SeqCst);
            results.push(self.execute_one(item).await);
        }
        drop(queue);

        if results.is_empty() {
            return CycleOutcome::Idle;
        }

        let batch = BatchResult {
            processed: results.len(),
            remaining: self.pending(),
            elapsed: started.elapsed(),
            results,
        };
        let failed = batch.failed();

        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.items_processed.fetch_add(batch.processed as u64, Ordering::Relaxed);
        self.items_failed.fetch_add(failed as u64, Ordering::Relaxed);

        if failed > 0 {
            component_warn!(
                Component::Scheduler,
                processed = batch.processed,
                failed,
                remaining = batch.remaining,
                "⚠️ Batch finished with failures in {:?}",
                batch.elapsed
            );
        } else {
            component_debug!(
                Component::Scheduler,
                processed = batch.processed,
                remaining = batch.remaining,
                "Batch finished in {:?}",
                batch.elapsed
            );
        }

        // No subscribers is fine
        let _ = self.events.send(batch.clone());
        CycleOutcome::Completed(batch)
    }

    async fn execute_one(&self, item: WorkItem) -> ItemResult {
        let started = Instant::now();
        let outcome = match AssertUnwindSafe(self.executor.execute(&item)).catch_unwind().await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(e)) => {
                component_debug!(Component::Scheduler, "Work item {} ({}) failed: {}", item.id, item.kind, e);
                Err(e.to_string())
            }
            Err(_) => Err(AnalyticsError::TaskPanicked { id: item.id.to_string() }.to_string()),
        };

        ItemResult {
            id: item.id,
            kind: item.kind,
            outcome,
            elapsed: started.elapsed(),
        }
    }

    /// Run cycles until the queue is empty. Ignores the tick interval.
    pub async fn drain(&self) -> Vec<BatchResult> {
        let mut batches = Vec::new();
        loop {
            match self.run_cycle().await {
                CycleOutcome::Completed(batch) => batches.push(batch),
                CycleOutcome::Idle => break,
                CycleOutcome::Skipped => tokio::task::yield_now().await,
            }
        }
        batches
    }

    /// Start the tick loop. Each tick runs its cycle on its own task so a slow
    /// cycle makes later ticks skip instead of piling up behind it. On
    /// shutdown the loop waits for any cycle still in flight.
    pub fn spawn(scheduler: Arc<Self>, mut shutdown: mpsc::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let every = scheduler.config.tick_interval();
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            component_info!(
                Component::Scheduler,
                "⏱️ Scheduler ticking every {:?} (batch {}, budget {:?})",
                every,
                scheduler.config.max_batch_size,
                scheduler.config.max_processing_time()
            );

            let mut cycles = JoinSet::new();
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Reap finished cycles so the set only holds live ones
                        while let Some(Some(_)) = cycles.join_next().now_or_never() {}
                        let scheduler = Arc::clone(&scheduler);
                        cycles.spawn(async move {
                            scheduler.run_cycle().await;
                        });
                    }
                    _ = shutdown.recv() => {
                        if !cycles.is_empty() {
                            component_debug!(Component::Scheduler, in_flight = cycles.len(), "Waiting for running cycle");
                        }
                        while let Some(joined) = cycles.join_next().await {
                            if let Err(e) = joined {
                                component_warn!(Component::Scheduler, error = %e, "Cycle task ended abnormally");
                            }
                        }
                        component_info!(Component::Scheduler, pending = scheduler.pending(), "Scheduler stopped");
                        break;
                    }
                }
            }
        })
    }
}
