//! Test helpers and builder patterns for analytics tests
//!
//! `OrchestratorBuilder` wires a mock snapshot provider into a real
//! orchestrator so tests control exactly what the provider returns and how
//! often it may be called.

use std::ops::RangeInclusive;
use std::sync::Arc;

use farmstats_analytics::traits::MockSnapshotProvider;
use farmstats_analytics::types::{ComparisonOutcome, ComparisonResult, Dashboard, TrendOutcome, TrendResult};
use farmstats_analytics::{AnalysisOrchestrator, AnalyticsError};
use farmstats_shared::{AnalyticsConfig, FarmSnapshot};

use super::fixtures::TestFixtures;

pub type TestOrchestrator = AnalysisOrchestrator<MockSnapshotProvider>;

pub struct OrchestratorBuilder {
    provider: MockSnapshotProvider,
    config: AnalyticsConfig,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            provider: MockSnapshotProvider::new(),
            config: TestFixtures::config(),
        }
    }

    /// Provider returns `snapshot` any number of times
    pub fn with_snapshot(mut self, snapshot: FarmSnapshot) -> Self {
        self.provider
            .expect_collect_snapshot()
            .times(0..)
            .returning(move || Ok(snapshot.clone()));
        self
    }

    /// Provider returns `snapshot` and must be called within `calls`
    pub fn with_snapshot_calls(mut self, snapshot: FarmSnapshot, calls: RangeInclusive<usize>) -> Self {
        self.provider
            .expect_collect_snapshot()
            .times(calls)
            .returning(move || Ok(snapshot.clone()));
        self
    }

    pub fn with_failing_provider(mut self, calls: RangeInclusive<usize>) -> Self {
        self.provider
            .expect_collect_snapshot()
            .times(calls)
            .returning(|| Err(AnalyticsError::snapshot("save file locked")));
        self
    }

    pub fn with_config(mut self, config: AnalyticsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TestOrchestrator {
        AnalysisOrchestrator::new(Arc::new(self.provider), &self.config).expect("valid test configuration")
    }

    pub fn build_shared(self) -> Arc<TestOrchestrator> {
        Arc::new(self.build())
    }
}

pub struct TestHelpers;

impl TestHelpers {
    pub fn expect_trend(outcome: &TrendOutcome) -> &TrendResult {
        match outcome {
            TrendOutcome::Trend(result) => result,
            other => panic!("expected a trend result, got {other:?}"),
        }
    }

    pub fn expect_comparison(outcome: &ComparisonOutcome) -> &ComparisonResult {
        match outcome {
            ComparisonOutcome::Compared(result) => result,
            other => panic!("expected a comparison result, got {other:?}"),
        }
    }

    /// Overall score must be the 60/40 blend of the section subtotals
    pub fn assert_scores_consistent(dashboard: &Dashboard) {
        let expected = 0.6 * dashboard.trend_score + 0.4 * dashboard.comparison_score;
        assert!((dashboard.overall_score - expected).abs() < 1e-9);
        assert!((0.0..=100.0).contains(&dashboard.overall_score));
    }
}
