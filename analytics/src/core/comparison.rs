//! Benchmark comparison engine
//!
//! Scores a farm's derived metrics against named benchmark profiles.
//! Recommendation text comes from fixed pools so identical inputs always
//! produce identical advice.

use std::collections::HashMap;

use farmstats_shared::{BenchmarkProfile, FarmSnapshot};
use serde::{Deserialize, Serialize};

use crate::core::trend::{linear_regression, MIN_TREND_POINTS};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::types::{ComparisonKind, ComparisonResult, MetricComparison, Rating};

/// Composite weights, in `ComparisonKind::METRICS` order
pub const COMPOSITE_WEIGHTS: [(ComparisonKind, f64); 4] = [
    (ComparisonKind::Profitability, 0.4),
    (ComparisonKind::Efficiency, 0.3),
    (ComparisonKind::Diversity, 0.2),
    (ComparisonKind::GrowthPotential, 0.1),
];

/// `(subject - benchmark) / benchmark * 100`, or 0 against a zero benchmark
pub fn percentage_difference(subject: f64, benchmark: f64) -> f64 {
    if benchmark == 0.0 {
        0.0
    } else {
        (subject - benchmark) / benchmark * 100.0
    }
}

/// Map a percentage difference onto a rating tier. Monotonic in `difference`.
pub fn rate(difference: f64) -> Rating {
    if difference >= 50.0 {
        Rating::Excellent
    } else if difference >= 20.0 {
        Rating::Good
    } else if difference >= -10.0 {
        Rating::Average
    } else if difference >= -30.0 {
        Rating::BelowAverage
    } else {
        Rating::Poor
    }
}

/// The four comparable metrics derived from a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmMetrics {
    pub earnings_per_hour: f64,
    pub efficiency: f64,
    pub diversity: f64,
    pub growth_potential: f64,
}

impl FarmMetrics {
    pub fn from_snapshot(snapshot: &FarmSnapshot) -> Self {
        let hours = snapshot.play_time_hours;
        let per_hour = |total: f64| if hours > 0.0 { total / hours } else { 0.0 };

        let daily_earnings: Vec<f64> = snapshot.history.iter().map(|r| r.earnings as f64).collect();
        let growth_potential = if daily_earnings.len() >= MIN_TREND_POINTS {
            let mean = daily_earnings.iter().sum::<f64>() / daily_earnings.len() as f64;
            if mean > 0.0 {
                linear_regression(&daily_earnings).slope / mean * 100.0
            } else {
                0.0
            }
        } else {
            0.0
        };

        Self {
            earnings_per_hour: per_hour(snapshot.total_earnings as f64),
            efficiency: per_hour((snapshot.crops_harvested + snapshot.animal_products) as f64),
            diversity: f64::from(snapshot.crop_varieties + snapshot.animal_varieties),
            growth_potential,
        }
    }

    /// Value of a single metric. `Overall` has no raw value and yields 0.
    pub fn value(&self, kind: ComparisonKind) -> f64 {
        match kind {
            ComparisonKind::Profitability => self.earnings_per_hour,
            ComparisonKind::Efficiency => self.efficiency,
            ComparisonKind::Diversity => self.diversity,
            ComparisonKind::GrowthPotential => self.growth_potential,
            ComparisonKind::Overall => 0.0,
        }
    }
}

fn benchmark_value(profile: &BenchmarkProfile, kind: ComparisonKind) -> f64 {
    match kind {
        ComparisonKind::Profitability => profile.earnings_per_hour,
        ComparisonKind::Efficiency => profile.efficiency,
        ComparisonKind::Diversity => profile.diversity,
        ComparisonKind::GrowthPotential => profile.growth_potential,
        ComparisonKind::Overall => 0.0,
    }
}

/// Compares farm metrics against a read-only benchmark table
#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    profiles: HashMap<String, BenchmarkProfile>,
}

impl ComparisonEngine {
    pub fn new(profiles: Vec<BenchmarkProfile>) -> AnalyticsResult<Self> {
        if profiles.is_empty() {
            return Err(AnalyticsError::config("benchmarks", "at least one benchmark profile is required"));
        }
        let profiles = profiles.into_iter().map(|p| (p.name.clone(), p)).collect();
        Ok(Self { profiles })
    }

    pub fn profile(&self, name: &str) -> AnalyticsResult<&BenchmarkProfile> {
        self.profiles.get(name).ok_or_else(|| AnalyticsError::UnknownBenchmark { name: name.to_string() })
    }

    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Score one metric against a profile
    pub fn compare_metric(&self, kind: ComparisonKind, metrics: &FarmMetrics, profile: &BenchmarkProfile) -> MetricComparison {
        let subject_value = metrics.value(kind);
        let benchmark_value = benchmark_value(profile, kind);
        MetricComparison {
            name: kind.as_str().to_string(),
            subject_value,
            benchmark_value,
            difference: percentage_difference(subject_value, benchmark_value),
            unit: kind.unit().to_string(),
        }
    }

    /// Compare `metrics` against the named profile
    pub fn compare(&self, kind: ComparisonKind, metrics: &FarmMetrics, profile_name: &str) -> AnalyticsResult<ComparisonResult> {
        let profile = self.profile(profile_name)?;

        if kind == ComparisonKind::Overall {
            return Ok(self.compare_composite(metrics, profile));
        }

        let metric = self.compare_metric(kind, metrics, profile);
        let rating = rate(metric.difference);
        let summary = describe(kind, metric.difference, rating, &profile.name);
        let recommendations = vec![select_recommendation(kind, rating, metric.difference).to_string()];

        Ok(ComparisonResult {
            kind,
            profile: profile.name.clone(),
            subject_value: metric.subject_value,
            benchmark_value: metric.benchmark_value,
            percentage_difference: metric.difference,
            rating,
            metrics: vec![metric],
            summary,
            recommendations,
        })
    }

    fn compare_composite(&self, metrics: &FarmMetrics, profile: &BenchmarkProfile) -> ComparisonResult {
        let breakdown: Vec<MetricComparison> = COMPOSITE_WEIGHTS
            .iter()
            .map(|(kind, _)| self.compare_metric(*kind, metrics, profile))
            .collect();

        let overall_difference: f64 = COMPOSITE_WEIGHTS
            .iter()
            .zip(&breakdown)
            .map(|((_, weight), metric)| weight * metric.difference)
            .sum();
        let rating = rate(overall_difference);

        // Weakest metrics first so the most useful advice leads
        let mut ranked: Vec<(ComparisonKind, &MetricComparison)> = COMPOSITE_WEIGHTS
            .iter()
            .map(|(kind, _)| *kind)
            .zip(&breakdown)
            .collect();
        ranked.sort_by(|a, b| a.1.difference.total_cmp(&b.1.difference));

        let mut recommendations: Vec<String> = ranked
            .iter()
            .filter(|(_, metric)| rate(metric.difference) <= Rating::Average)
            .map(|(kind, metric)| select_recommendation(*kind, rate(metric.difference), metric.difference).to_string())
            .collect();
        if recommendations.is_empty() {
            if let Some((kind, metric)) = ranked.first() {
                recommendations.push(select_recommendation(*kind, rate(metric.difference), metric.difference).to_string());
            }
        }

        ComparisonResult {
            kind: ComparisonKind::Overall,
            profile: profile.name.clone(),
            subject_value: 100.0 + overall_difference,
            benchmark_value: 100.0,
            percentage_difference: overall_difference,
            rating,
            summary: describe(ComparisonKind::Overall, overall_difference, rating, &profile.name),
            metrics: breakdown,
            recommendations,
        }
    }
}

fn describe(kind: ComparisonKind, difference: f64, rating: Rating, profile: &str) -> String {
    let relation = if difference >= 0.0 { "above" } else { "below" };
    format!(
        "{} is {:.1}% {} the {} benchmark ({}).",
        kind.label(),
        difference.abs(),
        relation,
        profile,
        rating
    )
}

/// Pick one advisory line for a metric and rating without randomness
pub fn select_recommendation(kind: ComparisonKind, rating: Rating, difference: f64) -> &'static str {
    let pool = recommendation_pool(kind, rating);
    let index = if difference.is_finite() {
        difference.abs().round() as usize % pool.len()
    } else {
        0
    };
    pool[index]
}

/// Fixed advisory pool for each metric and rating
pub fn recommendation_pool(kind: ComparisonKind, rating: Rating) -> &'static [&'static str] {
    use ComparisonKind::*;
    use Rating::*;

    match (kind, rating) {
        (Profitability, Poor | BelowAverage) => &[
            "Switch part of the field to the season's most valuable crop",
            "Turn raw produce into artisan goods before selling",
            "Sell through the shipping bin daily instead of hoarding stock",
        ],
        (Profitability, Average) => &[
            "Kegs and preserves jars would push profits past the benchmark",
            "Prioritize crops that regrow to cut seed costs",
        ],
        (Profitability, Good | Excellent) => &[
            "Profits are strong; invest in upgrades that compound",
            "Diversify income so a bad season does not hurt as much",
        ],
        (Efficiency, Poor | BelowAverage) => &[
            "Install sprinklers to cut daily watering time",
            "Group crops by harvest day to shorten chore routes",
            "Plan each day's route before leaving the house",
        ],
        (Efficiency, Average) => &[
            "Upgrade tools to clear and harvest faster",
            "Auto-feeders and auto-grabbers save time every morning",
        ],
        (Efficiency, Good | Excellent) => &[
            "Chores are efficient; use the spare hours on new ventures",
        ],
        (Diversity, Poor | BelowAverage) => &[
            "Add a second crop type each season to spread risk",
            "Start a small coop; animals produce every day of the year",
        ],
        (Diversity, Average) => &[
            "Try a fruit tree orchard for steady seasonal income",
            "A greenhouse allows off-season crops",
        ],
        (Diversity, Good | Excellent) => &[
            "Variety is excellent; focus on the most profitable lines",
        ],
        (GrowthPotential, Poor | BelowAverage) => &[
            "Growth has stalled; reinvest more of each day's profits",
            "Expand cultivated land before the next season starts",
        ],
        (GrowthPotential, Average) => &[
            "Steady growth; one larger investment could speed it up",
        ],
        (GrowthPotential, Good | Excellent) => &[
            "Growth is fast; keep cash reserves for seasonal seed costs",
        ],
        (Overall, Poor | BelowAverage) => &[
            "Focus on one weak area at a time, starting with profitability",
        ],
        (Overall, Average) => &[
            "The farm is on par; small upgrades will move it ahead",
        ],
        (Overall, Good | Excellent) => &[
            "The farm outperforms its peers; maintain the current strategy",
        ],
    }
}
