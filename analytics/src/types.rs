//! Analysis result types and work item definitions
//!
//! Everything here is plain data: produced by the engines, cached by the
//! orchestrator and read by consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use farmstats_shared::WorkItemId;

use crate::error::{AnalyticsError, AnalyticsResult};

/// Series a trend analysis can be run over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendKind {
    Earnings,
    CropProduction,
    AnimalProduction,
    EarningsPerHour,
}

impl TrendKind {
    pub const ALL: [TrendKind; 4] = [
        TrendKind::Earnings,
        TrendKind::CropProduction,
        TrendKind::AnimalProduction,
        TrendKind::EarningsPerHour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendKind::Earnings => "earnings",
            TrendKind::CropProduction => "crop_production",
            TrendKind::AnimalProduction => "animal_production",
            TrendKind::EarningsPerHour => "earnings_per_hour",
        }
    }

    /// Human readable name used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            TrendKind::Earnings => "Daily earnings",
            TrendKind::CropProduction => "Crop production",
            TrendKind::AnimalProduction => "Animal production",
            TrendKind::EarningsPerHour => "Earnings per hour",
        }
    }
}

impl fmt::Display for TrendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric a comparison is scored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonKind {
    Profitability,
    Efficiency,
    Diversity,
    GrowthPotential,
    /// Weighted composite of the four metrics above
    Overall,
}

impl ComparisonKind {
    pub const METRICS: [ComparisonKind; 4] = [
        ComparisonKind::Profitability,
        ComparisonKind::Efficiency,
        ComparisonKind::Diversity,
        ComparisonKind::GrowthPotential,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonKind::Profitability => "profitability",
            ComparisonKind::Efficiency => "efficiency",
            ComparisonKind::Diversity => "diversity",
            ComparisonKind::GrowthPotential => "growth_potential",
            ComparisonKind::Overall => "overall",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComparisonKind::Profitability => "Profitability",
            ComparisonKind::Efficiency => "Efficiency",
            ComparisonKind::Diversity => "Diversity",
            ComparisonKind::GrowthPotential => "Growth potential",
            ComparisonKind::Overall => "Overall performance",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ComparisonKind::Profitability => "gold/hour",
            ComparisonKind::Efficiency => "items/hour",
            ComparisonKind::Diversity => "varieties",
            ComparisonKind::GrowthPotential => "%/day",
            ComparisonKind::Overall => "index",
        }
    }
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form analysis parameters.
///
/// Backed by an ordered map so equal parameter sets always produce the same
/// fingerprint regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams(BTreeMap<String, Value>);

impl AnalysisParams {
    pub const WINDOW: &'static str = "window";
    pub const HORIZON: &'static str = "horizon";
    pub const PROFILE: &'static str = "profile";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn with_window(self, days: usize) -> Self {
        self.with(Self::WINDOW, days)
    }

    pub fn with_horizon(self, steps: usize) -> Self {
        self.with(Self::HORIZON, steps)
    }

    pub fn with_profile(self, profile: &str) -> Self {
        self.with(Self::PROFILE, profile)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of most recent days to analyze, `None` for the whole history
    pub fn window(&self) -> AnalyticsResult<Option<usize>> {
        match self.0.get(Self::WINDOW) {
            None => Ok(None),
            Some(value) => match value.as_u64() {
                Some(days) if days > 0 => Ok(Some(days as usize)),
                _ => Err(AnalyticsError::parameter(Self::WINDOW, format!("expected a positive integer, got {value}"))),
            },
        }
    }

    pub fn horizon(&self, default: usize) -> AnalyticsResult<usize> {
        match self.0.get(Self::HORIZON) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .map(|steps| steps as usize)
                .ok_or_else(|| AnalyticsError::parameter(Self::HORIZON, format!("expected an integer, got {value}"))),
        }
    }

    pub fn profile(&self, default: &str) -> AnalyticsResult<String> {
        match self.0.get(Self::PROFILE) {
            None => Ok(default.to_string()),
            Some(Value::String(name)) => Ok(name.clone()),
            Some(value) => Err(AnalyticsError::parameter(Self::PROFILE, format!("expected a string, got {value}"))),
        }
    }

    /// Stable hash of the parameter set, used in cache keys
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (name, value) in &self.0 {
            name.hash(&mut hasher);
            value.to_string().hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrendStrength {
    Weak,
    Medium,
    Strong,
}

impl fmt::Display for TrendStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendStrength::Weak => write!(f, "weak"),
            TrendStrength::Medium => write!(f, "medium"),
            TrendStrength::Strong => write!(f, "strong"),
        }
    }
}

/// Least squares line fitted against the point index
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, always within [0, 1]
    pub r_squared: f64,
}

impl LinearTrend {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub kind: TrendKind,
    pub direction: TrendDirection,
    pub strength: TrendStrength,
    pub fit: LinearTrend,
    pub current: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub confidence: f64,
    pub projection: Vec<f64>,
    pub summary: String,
    pub recommendations: Vec<String>,
}

/// Result of a trend analysis request.
///
/// Callers must branch on the variant; only `Trend` carries numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrendOutcome {
    Trend(TrendResult),
    InsufficientData {
        kind: TrendKind,
        available: usize,
        required: usize,
    },
    /// Placeholder for an analysis that failed at the orchestrator boundary
    Unavailable { kind: TrendKind, reason: String },
}

impl TrendOutcome {
    pub fn kind(&self) -> TrendKind {
        match self {
            TrendOutcome::Trend(result) => result.kind,
            TrendOutcome::InsufficientData { kind, .. } => *kind,
            TrendOutcome::Unavailable { kind, .. } => *kind,
        }
    }

    pub fn result(&self) -> Option<&TrendResult> {
        match self {
            TrendOutcome::Trend(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, TrendOutcome::InsufficientData { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, TrendOutcome::Unavailable { .. })
    }
}

/// Rating tiers, ordered worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    Poor,
    BelowAverage,
    Average,
    Good,
    Excellent,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Poor => write!(f, "poor"),
            Rating::BelowAverage => write!(f, "below average"),
            Rating::Average => write!(f, "average"),
            Rating::Good => write!(f, "good"),
            Rating::Excellent => write!(f, "excellent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub name: String,
    pub subject_value: f64,
    pub benchmark_value: f64,
    /// Percentage difference against the benchmark, may be negative
    pub difference: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub kind: ComparisonKind,
    pub profile: String,
    pub subject_value: f64,
    pub benchmark_value: f64,
    pub percentage_difference: f64,
    pub rating: Rating,
    pub metrics: Vec<MetricComparison>,
    pub summary: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Compared(ComparisonResult),
    /// Placeholder for an analysis that failed at the orchestrator boundary
    Unavailable { kind: ComparisonKind, reason: String },
}

impl ComparisonOutcome {
    pub fn kind(&self) -> ComparisonKind {
        match self {
            ComparisonOutcome::Compared(result) => result.kind,
            ComparisonOutcome::Unavailable { kind, .. } => *kind,
        }
    }

    pub fn result(&self) -> Option<&ComparisonResult> {
        match self {
            ComparisonOutcome::Compared(result) => Some(result),
            ComparisonOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ComparisonOutcome::Unavailable { .. })
    }
}

/// Composite, cached output of one orchestration cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub snapshot_day: Option<u32>,
    pub trends: Vec<TrendOutcome>,
    pub comparisons: Vec<ComparisonOutcome>,
    pub trend_score: f64,
    pub comparison_score: f64,
    /// Weighted blend of the two subtotals, within [0, 100]
    pub overall_score: f64,
    pub key_insights: Vec<String>,
    pub actionable_recommendations: Vec<String>,
}

impl Dashboard {
    /// True when every section holds a real or insufficient-data result
    pub fn is_complete(&self) -> bool {
        !self.trends.iter().any(TrendOutcome::is_unavailable)
            && !self.comparisons.iter().any(ComparisonOutcome::is_unavailable)
    }
}

/// Request and timing counters exposed to consumers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    pub analyses_computed: u64,
    pub avg_analysis_time_ms: f64,
}

/// Closed set of background work the scheduler can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkKind {
    Trend(TrendKind),
    Comparison(ComparisonKind),
    Dashboard,
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkKind::Trend(kind) => write!(f, "trend:{kind}"),
            WorkKind::Comparison(kind) => write!(f, "comparison:{kind}"),
            WorkKind::Dashboard => write!(f, "dashboard"),
        }
    }
}

/// Unit of work queued on the scheduler, consumed exactly once
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub kind: WorkKind,
    pub parameters: AnalysisParams,
}

impl WorkItem {
    pub fn new(kind: WorkKind) -> Self {
        Self {
            id: WorkItemId::new(),
            kind,
            parameters: AnalysisParams::new(),
        }
    }

    pub fn with_parameters(kind: WorkKind, parameters: AnalysisParams) -> Self {
        Self {
            id: WorkItemId::new(),
            kind,
            parameters,
        }
    }
}

/// Value produced by executing a work item
#[derive(Debug, Clone, PartialEq)]
pub enum WorkPayload {
    Trend(TrendOutcome),
    Comparison(ComparisonResult),
    Dashboard(Arc<Dashboard>),
}

/// Outcome of a single item within a batch
#[derive(Debug, Clone)]
pub struct ItemResult {
    pub id: WorkItemId,
    pub kind: WorkKind,
    pub outcome: Result<WorkPayload, String>,
    pub elapsed: Duration,
}

impl ItemResult {
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of draining one scheduler cycle
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub processed: usize,
    pub results: Vec<ItemResult>,
    /// Items still queued when the cycle ended
    pub remaining: usize,
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success()).count()
    }
}
