//! Analysis orchestrator
//!
//! Turns snapshots from the injected `SnapshotProvider` into cached trend,
//! comparison and dashboard results. This is the only layer that converts
//! failures into placeholders: everything below it returns typed errors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use farmstats_shared::logging::log_error;
use farmstats_shared::{component_debug, component_info, component_warn};
use farmstats_shared::{AnalysisConfig, AnalyticsConfig, Component, FarmSnapshot, TimeSeriesPoint};
use futures_util::future::join_all;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::core::insights::{actionable_recommendations, key_insights, score_dashboard};
use crate::core::{ComparisonEngine, FarmMetrics, TrendEngine};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::services::{CacheStatistics, CacheStore};
use crate::traits::{AnalysisConsumer, SnapshotProvider, WorkExecutor};
use crate::types::{
    AnalysisParams, ComparisonKind, ComparisonOutcome, ComparisonResult, Dashboard, PerformanceStats, TrendKind,
    TrendOutcome, WorkItem, WorkKind, WorkPayload,
};

pub const TREND_PREFIX: &str = "trend:";
pub const COMPARISON_PREFIX: &str = "comparison:";
pub const DASHBOARD_KEY: &str = "dashboard";

/// Trend sections shown on every dashboard
pub const DASHBOARD_TRENDS: [TrendKind; 3] = [TrendKind::Earnings, TrendKind::CropProduction, TrendKind::EarningsPerHour];
/// Comparison sections shown on every dashboard
pub const DASHBOARD_COMPARISONS: [ComparisonKind; 1] = [ComparisonKind::Overall];

pub fn trend_key(kind: TrendKind, params: &AnalysisParams) -> String {
    format!("{TREND_PREFIX}{kind}:{:016x}", params.fingerprint())
}

pub fn comparison_key(kind: ComparisonKind, params: &AnalysisParams) -> String {
    format!("{COMPARISON_PREFIX}{kind}:{:016x}", params.fingerprint())
}

/// Value stored in the orchestrator's cache
#[derive(Debug, Clone)]
pub enum CachedAnalysis {
    Trend(TrendOutcome),
    Comparison(ComparisonResult),
    Dashboard(Arc<Dashboard>),
}

/// One provider call shared by every section of a dashboard build.
/// A failure keeps the provider's message so every section reports it once.
type SnapshotCell = OnceCell<Result<Arc<FarmSnapshot>, String>>;

#[derive(Default)]
struct RequestCounters {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    analyses_computed: AtomicU64,
    analysis_time_us: AtomicU64,
}

impl RequestCounters {
    fn request(&self, hit: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn computed(&self, elapsed: Duration) {
        self.analyses_computed.fetch_add(1, Ordering::Relaxed);
        self.analysis_time_us.fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PerformanceStats {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let analyses_computed = self.analyses_computed.load(Ordering::Relaxed);
        let analysis_time_us = self.analysis_time_us.load(Ordering::Relaxed);

        PerformanceStats {
            total_requests,
            cache_hits,
            cache_hit_rate: if total_requests == 0 {
                0.0
            } else {
                cache_hits as f64 / total_requests as f64
            },
            analyses_computed,
            avg_analysis_time_ms: if analyses_computed == 0 {
                0.0
            } else {
                analysis_time_us as f64 / analyses_computed as f64 / 1000.0
            },
        }
    }
}

/// Composes the provider, the engines and the cache into read-through
/// analysis calls
pub struct AnalysisOrchestrator<P>
where
    P: SnapshotProvider + 'static,
{
    provider: Arc<P>,
    cache: Arc<CacheStore<String, CachedAnalysis>>,
    trends: TrendEngine,
    comparisons: ComparisonEngine,
    config: AnalysisConfig,
    counters: RequestCounters,
}

impl<P> AnalysisOrchestrator<P>
where
    P: SnapshotProvider + 'static,
{
    pub fn new(provider: Arc<P>, config: &AnalyticsConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        let comparisons = ComparisonEngine::new(config.benchmarks.clone())?;
        // Fail at construction, not on the first dashboard
        comparisons.profile(&config.analysis.default_profile)?;

        Ok(Self {
            provider,
            cache: Arc::new(CacheStore::new(config.cache.clone())?),
            trends: TrendEngine::new(),
            comparisons,
            config: config.analysis.clone(),
            counters: RequestCounters::default(),
        })
    }

    /// Shared handle to the result cache, for the background sweeper
    pub fn cache(&self) -> Arc<CacheStore<String, CachedAnalysis>> {
        Arc::clone(&self.cache)
    }

    pub fn benchmark_profiles(&self) -> Vec<&str> {
        self.comparisons.profile_names()
    }

    async fn load_snapshot(&self, cell: &SnapshotCell) -> AnalyticsResult<Arc<FarmSnapshot>> {
        let loaded = cell
            .get_or_init(|| async {
                self.provider
                    .collect_snapshot()
                    .await
                    .map(Arc::new)
                    .map_err(|e| match e {
                        AnalyticsError::SnapshotUnavailable { message } => message,
                        other => other.to_string(),
                    })
            })
            .await;

        match loaded {
            Ok(snapshot) => Ok(Arc::clone(snapshot)),
            Err(message) => Err(AnalyticsError::snapshot(message.clone())),
        }
    }

    fn series_for(kind: TrendKind, snapshot: &FarmSnapshot) -> Vec<TimeSeriesPoint> {
        match kind {
            TrendKind::Earnings => snapshot.series(|r| r.earnings as f64),
            TrendKind::CropProduction => snapshot.series(|r| r.crops_harvested as f64),
            TrendKind::AnimalProduction => snapshot.series(|r| r.animal_products as f64),
            TrendKind::EarningsPerHour => snapshot.series(|r| {
                if r.hours_played == 0.0 {
                    0.0
                } else {
                    r.earnings as f64 / r.hours_played
                }
            }),
        }
    }

    async fn compute_trend(&self, kind: TrendKind, params: &AnalysisParams, cell: &SnapshotCell) -> AnalyticsResult<TrendOutcome> {
        let horizon = params.horizon(self.config.projection_horizon)?;
        let window = params.window()?;
        let snapshot = self.load_snapshot(cell).await?;

        let started = Instant::now();
        let mut points = Self::series_for(kind, &snapshot);
        if let Some(days) = window {
            points = points.split_off(points.len().saturating_sub(days));
        }
        let outcome = self.trends.analyze(kind, &points, horizon)?;
        self.counters.computed(started.elapsed());

        self.cache
            .set_with_ttl(trend_key(kind, params), CachedAnalysis::Trend(outcome.clone()), self.config.trend_ttl())
            .await;
        Ok(outcome)
    }

    async fn compute_comparison(
        &self,
        kind: ComparisonKind,
        params: &AnalysisParams,
        cell: &SnapshotCell,
    ) -> AnalyticsResult<ComparisonResult> {
        let profile = params.profile(&self.config.default_profile)?;
        let snapshot = self.load_snapshot(cell).await?;

        let started = Instant::now();
        let metrics = FarmMetrics::from_snapshot(&snapshot);
        let result = self.comparisons.compare(kind, &metrics, &profile)?;
        self.counters.computed(started.elapsed());

        self.cache
            .set_with_ttl(
                comparison_key(kind, params),
                CachedAnalysis::Comparison(result.clone()),
                self.config.comparison_ttl(),
            )
            .await;
        Ok(result)
    }

    /// Cached trend, or a fresh one. The flag reports a cache hit.
    async fn cached_trend(
        &self,
        kind: TrendKind,
        params: &AnalysisParams,
        cell: &SnapshotCell,
    ) -> AnalyticsResult<(TrendOutcome, bool)> {
        if let Some(CachedAnalysis::Trend(outcome)) = self.cache.get(&trend_key(kind, params)).await {
            return Ok((outcome, true));
        }
        Ok((self.compute_trend(kind, params, cell).await?, false))
    }

    async fn cached_comparison(
        &self,
        kind: ComparisonKind,
        params: &AnalysisParams,
        cell: &SnapshotCell,
    ) -> AnalyticsResult<(ComparisonResult, bool)> {
        if let Some(CachedAnalysis::Comparison(result)) = self.cache.get(&comparison_key(kind, params)).await {
            return Ok((result, true));
        }
        Ok((self.compute_comparison(kind, params, cell).await?, false))
    }

    /// Trend section for `kind`. Errors are logged and become an
    /// uncached `Unavailable` placeholder.
    async fn trend_section(&self, kind: TrendKind, params: &AnalysisParams, cell: &SnapshotCell) -> (TrendOutcome, bool) {
        match self.cached_trend(kind, params, cell).await {
            Ok(found) => found,
            Err(e) => {
                log_error(Component::Orchestrator, &format!("{kind} trend"), &e);
                let placeholder = TrendOutcome::Unavailable {
                    kind,
                    reason: e.to_string(),
                };
                (placeholder, false)
            }
        }
    }

    async fn comparison_section(
        &self,
        kind: ComparisonKind,
        params: &AnalysisParams,
        cell: &SnapshotCell,
    ) -> (ComparisonOutcome, bool) {
        match self.cached_comparison(kind, params, cell).await {
            Ok((result, hit)) => (ComparisonOutcome::Compared(result), hit),
            Err(e) => {
                log_error(Component::Orchestrator, &format!("{kind} comparison"), &e);
                let placeholder = ComparisonOutcome::Unavailable {
                    kind,
                    reason: e.to_string(),
                };
                (placeholder, false)
            }
        }
    }

    /// Trend for `kind`, served from cache for up to the trend TTL. Never
    /// fails: a provider fault or bad parameter yields `Unavailable`.
    pub async fn get_trend(&self, kind: TrendKind, params: &AnalysisParams) -> TrendOutcome {
        let (outcome, hit) = self.trend_section(kind, params, &SnapshotCell::new()).await;
        self.counters.request(hit);
        outcome
    }

    /// Benchmark comparison for `kind`, served from cache for up to the
    /// comparison TTL. The `profile` parameter picks the benchmark; an
    /// unknown one yields `Unavailable`.
    pub async fn get_comparison(&self, kind: ComparisonKind, params: &AnalysisParams) -> ComparisonOutcome {
        let (outcome, hit) = self.comparison_section(kind, params, &SnapshotCell::new()).await;
        self.counters.request(hit);
        outcome
    }

    /// Cached dashboard, or a freshly built one. Never fails.
    pub async fn get_dashboard(&self) -> Arc<Dashboard> {
        if let Some(CachedAnalysis::Dashboard(dashboard)) = self.cache.get(DASHBOARD_KEY).await {
            self.counters.request(true);
            return dashboard;
        }
        self.counters.request(false);
        self.refresh_dashboard().await
    }

    /// Build a dashboard and cache it if every section succeeded
    pub async fn refresh_dashboard(&self) -> Arc<Dashboard> {
        let started = Instant::now();
        let dashboard = Arc::new(self.build_dashboard().await);
        let elapsed = started.elapsed();
        self.counters.computed(elapsed);

        if dashboard.is_complete() {
            self.cache
                .set_with_ttl(
                    DASHBOARD_KEY.to_string(),
                    CachedAnalysis::Dashboard(Arc::clone(&dashboard)),
                    self.config.dashboard_ttl(),
                )
                .await;
            component_info!(
                Component::Orchestrator,
                score = dashboard.overall_score,
                "📊 Dashboard built in {:?}",
                elapsed
            );
        } else {
            component_warn!(
                Component::Orchestrator,
                score = dashboard.overall_score,
                "📊 Dashboard built with unavailable sections; not caching it"
            );
        }
        dashboard
    }

    async fn build_dashboard(&self) -> Dashboard {
        let cell = SnapshotCell::new();
        let params = AnalysisParams::new();
        let (cell, params) = (&cell, &params);

        let trend_sections = DASHBOARD_TRENDS
            .into_iter()
            .map(|kind| async move { self.trend_section(kind, params, cell).await.0 });
        let comparison_sections = DASHBOARD_COMPARISONS
            .into_iter()
            .map(|kind| async move { self.comparison_section(kind, params, cell).await.0 });

        let (trends, comparisons) = tokio::join!(join_all(trend_sections), join_all(comparison_sections));

        let scores = score_dashboard(&trends, &comparisons);
        let snapshot_day = match cell.get() {
            Some(Ok(snapshot)) => Some(snapshot.day),
            _ => None,
        };

        Dashboard {
            generated_at: Utc::now(),
            snapshot_day,
            key_insights: key_insights(&trends, &comparisons, scores.overall),
            actionable_recommendations: actionable_recommendations(&trends, &comparisons, self.config.max_recommendations),
            trend_score: scores.trend,
            comparison_score: scores.comparison,
            overall_score: scores.overall,
            trends,
            comparisons,
        }
    }

    /// Drop cached results whose key starts with `prefix`, or everything
    pub async fn invalidate(&self, prefix: Option<&str>) -> usize {
        let removed = match prefix {
            Some(prefix) => self.cache.invalidate_where(|key| key.starts_with(prefix)).await,
            None => self.cache.clear().await,
        };
        component_debug!(
            Component::Orchestrator,
            removed,
            "Invalidated cache entries with prefix {:?}",
            prefix.unwrap_or("<all>")
        );
        removed
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        self.counters.snapshot()
    }

    pub async fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics().await
    }
}

#[async_trait::async_trait]
impl<P> WorkExecutor for AnalysisOrchestrator<P>
where
    P: SnapshotProvider + 'static,
{
    /// Background refresh: recompute and overwrite the cached entry
    async fn execute(&self, item: &WorkItem) -> AnalyticsResult<WorkPayload> {
        let cell = SnapshotCell::new();
        match item.kind {
            WorkKind::Trend(kind) => self
                .compute_trend(kind, &item.parameters, &cell)
                .await
                .map(WorkPayload::Trend),
            WorkKind::Comparison(kind) => self
                .compute_comparison(kind, &item.parameters, &cell)
                .await
                .map(WorkPayload::Comparison),
            WorkKind::Dashboard => Ok(WorkPayload::Dashboard(self.refresh_dashboard().await)),
        }
    }
}

#[async_trait::async_trait]
impl<P> AnalysisConsumer for AnalysisOrchestrator<P>
where
    P: SnapshotProvider + 'static,
{
    async fn dashboard(&self) -> Arc<Dashboard> {
        self.get_dashboard().await
    }

    async fn invalidate(&self, prefix: Option<String>) -> usize {
        AnalysisOrchestrator::invalidate(self, prefix.as_deref()).await
    }

    async fn performance_stats(&self) -> PerformanceStats {
        AnalysisOrchestrator::performance_stats(self)
    }
}
