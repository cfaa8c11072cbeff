//! Tests for TaskScheduler: batch bounds, ordering, isolation and the
//! re-entrancy guard

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use farmstats_shared::{SchedulerConfig, WorkItemId};
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::time::sleep;

use super::common::{ms, placeholder_payload, scheduler_config};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::services::task_scheduler::{CycleOutcome, TaskScheduler};
use crate::traits::{MockWorkExecutor, WorkExecutor};
use crate::types::{AnalysisParams, TrendKind, WorkItem, WorkKind, WorkPayload};

/// Sleeps for `delay`, records the item, and fails or panics on request
struct ScriptedExecutor {
    delay: Duration,
    executed: Mutex<Vec<WorkItemId>>,
}

impl ScriptedExecutor {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            executed: Mutex::new(Vec::new()),
        })
    }

    fn executed(&self) -> Vec<WorkItemId> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkExecutor for ScriptedExecutor {
    async fn execute(&self, item: &WorkItem) -> AnalyticsResult<WorkPayload> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.executed.lock().unwrap().push(item.id);

        if item.parameters.get("panic").is_some() {
            panic!("scripted panic");
        }
        if item.parameters.get("fail").is_some() {
            return Err(AnalyticsError::parameter("fail", "scripted failure"));
        }
        Ok(placeholder_payload())
    }
}

/// Blocks inside `execute` until released
struct GateExecutor {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl WorkExecutor for GateExecutor {
    async fn execute(&self, _item: &WorkItem) -> AnalyticsResult<WorkPayload> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(placeholder_payload())
    }
}

fn item() -> WorkItem {
    WorkItem::new(WorkKind::Trend(TrendKind::Earnings))
}

fn flagged(flag: &str) -> WorkItem {
    WorkItem::with_parameters(WorkKind::Dashboard, AnalysisParams::new().with(flag, true))
}

fn completed(outcome: CycleOutcome) -> crate::types::BatchResult {
    match outcome {
        CycleOutcome::Completed(batch) => batch,
        other => panic!("expected a completed cycle, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_cycle_respects_batch_size() {
    let executor = ScriptedExecutor::new(Duration::ZERO);
    let scheduler = TaskScheduler::new(executor, SchedulerConfig::default()).unwrap();
    scheduler.enqueue_many((0..120).map(|_| item()));

    let batch = completed(scheduler.run_cycle().await);

    assert_eq!(batch.processed, 50);
    assert_eq!(batch.remaining, 70);
    assert_eq!(scheduler.pending(), 70);
}

#[tokio::test(start_paused = true)]
async fn test_cycle_respects_time_budget() {
    let executor = ScriptedExecutor::new(ms(40));
    let scheduler = TaskScheduler::new(executor, scheduler_config(50, 100)).unwrap();
    scheduler.enqueue_many((0..10).map(|_| item()));

    let batch = completed(scheduler.run_cycle().await);

    // Checked between items: 0, 40 and 80ms are under budget, 120ms is not
    assert_eq!(batch.processed, 3);
    assert_eq!(batch.remaining, 7);
    assert!(batch.elapsed <= ms(100) + ms(40));
}

#[tokio::test(start_paused = true)]
async fn test_items_run_in_enqueue_order() {
    let executor = ScriptedExecutor::new(Duration::ZERO);
    let scheduler = TaskScheduler::new(Arc::clone(&executor), scheduler_config(2, 100)).unwrap();
    let items: Vec<WorkItem> = (0..5).map(|_| item()).collect();
    let ids: Vec<WorkItemId> = items.iter().map(|i| i.id).collect();
    scheduler.enqueue_many(items);

    let batches = scheduler.drain().await;

    let sizes: Vec<usize> = batches.iter().map(|b| b.processed).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(executor.executed(), ids);
}

#[tokio::test]
async fn test_failed_item_does_not_abort_batch() {
    let executor = ScriptedExecutor::new(Duration::ZERO);
    let scheduler = TaskScheduler::new(Arc::clone(&executor), SchedulerConfig::default()).unwrap();
    scheduler.enqueue_many(vec![item(), flagged("fail"), item()]);

    let batch = completed(scheduler.run_cycle().await);

    assert_eq!(batch.processed, 3);
    assert_eq!(batch.failed(), 1);
    assert!(batch.results[0].success());
    assert!(!batch.results[1].success());
    assert!(batch.results[2].success());
    assert_eq!(executor.executed().len(), 3);
}

#[tokio::test]
async fn test_panicking_item_is_captured() {
    let executor = ScriptedExecutor::new(Duration::ZERO);
    let scheduler = TaskScheduler::new(executor, SchedulerConfig::default()).unwrap();
    let panicking = flagged("panic");
    let panicking_id = panicking.id;
    scheduler.enqueue_many(vec![panicking, item()]);

    let batch = completed(scheduler.run_cycle().await);

    assert_eq!(batch.processed, 2);
    let error = batch.results[0].outcome.as_ref().unwrap_err();
    assert!(error.contains(&panicking_id.to_string()));
    assert!(batch.results[1].success());
    assert_eq!(scheduler.stats().items_failed, 1);
}

#[tokio::test]
async fn test_empty_queue_emits_nothing() {
    let scheduler = TaskScheduler::new(ScriptedExecutor::new(Duration::ZERO), SchedulerConfig::default()).unwrap();
    let mut events = scheduler.subscribe();

    assert!(matches!(scheduler.run_cycle().await, CycleOutcome::Idle));
    assert!(matches!(events.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    assert_eq!(scheduler.stats().cycles_completed, 0);
}

#[tokio::test]
async fn test_completed_cycle_emits_event() {
    let scheduler = TaskScheduler::new(ScriptedExecutor::new(Duration::ZERO), SchedulerConfig::default()).unwrap();
    let mut events = scheduler.subscribe();
    scheduler.enqueue_many(vec![item(), item()]);

    scheduler.run_cycle().await;

    let event = events.try_recv().unwrap();
    assert_eq!(event.processed, 2);
    assert_eq!(event.remaining, 0);
}

#[tokio::test]
async fn test_overlapping_cycle_is_skipped() {
    let executor = Arc::new(GateExecutor {
        started: Notify::new(),
        release: Notify::new(),
    });
    let scheduler = Arc::new(TaskScheduler::new(Arc::clone(&executor), SchedulerConfig::default()).unwrap());
    scheduler.enqueue(item());

    let running = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run_cycle().await })
    };
    executor.started.notified().await;

    assert!(matches!(scheduler.run_cycle().await, CycleOutcome::Skipped));
    assert_eq!(scheduler.stats().ticks_skipped, 1);

    executor.release.notify_one();
    let batch = completed(running.await.unwrap());
    assert_eq!(batch.processed, 1);
}

#[tokio::test]
async fn test_with_mock_executor() {
    let mut executor = MockWorkExecutor::new();
    executor
        .expect_execute()
        .withf(|item: &WorkItem| item.kind == WorkKind::Dashboard)
        .times(2)
        .returning(|_| Ok(placeholder_payload()));

    let scheduler = TaskScheduler::new(Arc::new(executor), SchedulerConfig::default()).unwrap();
    scheduler.enqueue(WorkItem::new(WorkKind::Dashboard));
    scheduler.enqueue(WorkItem::new(WorkKind::Dashboard));

    let batch = completed(scheduler.run_cycle().await);
    assert_eq!(batch.processed, 2);
    assert_eq!(batch.failed(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tick_loop_processes_queue() {
    let executor = ScriptedExecutor::new(Duration::ZERO);
    let scheduler = Arc::new(TaskScheduler::new(Arc::clone(&executor), SchedulerConfig::default()).unwrap());
    let mut events = scheduler.subscribe();
    scheduler.enqueue_many(vec![item(), item(), item()]);

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let handle = TaskScheduler::spawn(Arc::clone(&scheduler), shutdown_rx);

    let event = events.recv().await.unwrap();
    assert_eq!(event.processed, 3);
    assert_eq!(executor.executed().len(), 3);

    shutdown_tx.send(()).await.unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_running_cycle() {
    let executor = Arc::new(GateExecutor {
        started: Notify::new(),
        release: Notify::new(),
    });
    let scheduler = Arc::new(TaskScheduler::new(Arc::clone(&executor), SchedulerConfig::default()).unwrap());
    let mut events = scheduler.subscribe();
    scheduler.enqueue(item());

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let mut handle = TaskScheduler::spawn(Arc::clone(&scheduler), shutdown_rx);
    executor.started.notified().await;

    shutdown_tx.send(()).await.unwrap();
    // The loop must not finish while the cycle holds the gate
    assert!(tokio::time::timeout(ms(5_000), &mut handle).await.is_err());
    assert!(matches!(events.try_recv(), Err(broadcast::error::TryRecvError::Empty)));

    executor.release.notify_one();
    handle.await.unwrap();

    let batch = events.try_recv().unwrap();
    assert_eq!(batch.processed, 1);
    assert_eq!(scheduler.stats().cycles_completed, 1);
}

#[test]
fn test_invalid_config_rejected() {
    let result = TaskScheduler::new(ScriptedExecutor::new(Duration::ZERO), scheduler_config(0, 100));
    assert!(result.is_err());
}
