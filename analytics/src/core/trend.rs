//! Trend analysis engine
//!
//! Fits an ordinary least squares line to a series (point index as x),
//! classifies it and projects it forward. Pure functions only: no I/O and no
//! shared state.

use farmstats_shared::TimeSeriesPoint;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::types::{LinearTrend, TrendDirection, TrendKind, TrendOutcome, TrendResult, TrendStrength};

/// Fewer points than this produce `TrendOutcome::InsufficientData`
pub const MIN_TREND_POINTS: usize = 3;

/// Absolute slope below which a series counts as stable
pub const STABLE_SLOPE_THRESHOLD: f64 = 0.1;

/// Upper bound for any confidence score
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Fit `values` against `0..n-1`.
///
/// Slope is 0 for fewer than two points or a zero x-variance; `r_squared` is
/// 0 when the series has no variance and is always clamped to [0, 1].
pub fn linear_regression(values: &[f64]) -> LinearTrend {
    let n = values.len();
    if n == 0 {
        return LinearTrend::default();
    }

    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n_f;

    if n < 2 {
        return LinearTrend {
            slope: 0.0,
            intercept: y_mean,
            r_squared: 0.0,
        };
    }

    let mut covariance = 0.0;
    let mut x_variance = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        covariance += dx * (y - y_mean);
        x_variance += dx * dx;
    }

    let slope = if x_variance == 0.0 { 0.0 } else { covariance / x_variance };
    let intercept = y_mean - slope * x_mean;

    let ss_total: f64 = values.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_residual: f64 = values
        .iter()
        .enumerate()
        .map(|(i, y)| (y - (slope * i as f64 + intercept)).powi(2))
        .sum();

    let r_squared = if ss_total > 0.0 {
        (1.0 - ss_residual / ss_total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    LinearTrend {
        slope,
        intercept,
        r_squared,
    }
}

pub fn classify_direction(slope: f64) -> TrendDirection {
    if slope.abs() < STABLE_SLOPE_THRESHOLD {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    }
}

pub fn classify_strength(r_squared: f64) -> TrendStrength {
    if r_squared < 0.3 {
        TrendStrength::Weak
    } else if r_squared < 0.7 {
        TrendStrength::Medium
    } else {
        TrendStrength::Strong
    }
}

/// Confidence rewards fit quality and sample size, capped below certainty
pub fn confidence(sample_count: usize, trend: &LinearTrend) -> f64 {
    let sample_bonus = (sample_count as f64 * 0.02).min(0.3);
    (trend.r_squared + sample_bonus).clamp(0.0, MAX_CONFIDENCE)
}

/// Extend a fitted line `horizon` steps past a series of `sample_count` points
pub fn project_from(trend: &LinearTrend, sample_count: usize, horizon: usize) -> Vec<f64> {
    (0..horizon)
        .map(|step| trend.predict((sample_count + step) as f64).max(0.0))
        .collect()
}

/// Fit `values` and extend the line `horizon` steps, floored at zero
pub fn project(values: &[f64], horizon: usize) -> Vec<f64> {
    project_from(&linear_regression(values), values.len(), horizon)
}

/// Full trend analysis over a recorded series
#[derive(Debug, Clone)]
pub struct TrendEngine {
    min_points: usize,
}

impl TrendEngine {
    pub fn new() -> Self {
        Self {
            min_points: MIN_TREND_POINTS,
        }
    }

    /// Analyze `points` for `kind`.
    ///
    /// Too short a series is an `InsufficientData` outcome, not an error.
    /// A non-finite value is an error: it means the adapter fed garbage.
    pub fn analyze(&self, kind: TrendKind, points: &[TimeSeriesPoint], horizon: usize) -> AnalyticsResult<TrendOutcome> {
        if let Some(index) = points.iter().position(|p| !p.value.is_finite()) {
            return Err(AnalyticsError::NonFiniteValue { index });
        }

        if points.len() < self.min_points {
            return Ok(TrendOutcome::InsufficientData {
                kind,
                available: points.len(),
                required: self.min_points,
            });
        }

        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let fit = linear_regression(&values);
        let direction = classify_direction(fit.slope);
        let strength = classify_strength(fit.r_squared);
        let confidence = confidence(values.len(), &fit);

        let current = values[values.len() - 1];
        let average = values.iter().sum::<f64>() / values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let summary = format!(
            "{} is {} ({} trend, {:.0}% confidence). Current {:.1}, average {:.1}, range {:.1} to {:.1}.",
            kind.label(),
            direction,
            strength,
            confidence * 100.0,
            current,
            average,
            min,
            max
        );

        Ok(TrendOutcome::Trend(TrendResult {
            kind,
            direction,
            strength,
            fit,
            current,
            average,
            min,
            max,
            confidence,
            projection: project_from(&fit, values.len(), horizon),
            summary,
            recommendations: recommendations_for(kind, direction, strength),
        }))
    }
}

impl Default for TrendEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn recommendations_for(kind: TrendKind, direction: TrendDirection, strength: TrendStrength) -> Vec<String> {
    let advice: &[&str] = match (kind, direction) {
        (TrendKind::Earnings, TrendDirection::Increasing) => &[
            "Earnings are climbing; reinvest profits into sprinklers or barn upgrades",
            "Keep the current crop rotation while it keeps paying off",
        ],
        (TrendKind::Earnings, TrendDirection::Decreasing) => &[
            "Earnings are slipping; check which crops went out of season",
            "Process raw goods into artisan products to lift their value",
        ],
        (TrendKind::Earnings, TrendDirection::Stable) => &[
            "Earnings have plateaued; try one new high-value crop this season",
        ],
        (TrendKind::CropProduction, TrendDirection::Increasing) => &[
            "Harvests are growing; make sure storage and shipping keep pace",
        ],
        (TrendKind::CropProduction, TrendDirection::Decreasing) => &[
            "Fewer crops are coming in; replant empty plots and check watering",
            "Use fertilizer on the fields that produce the most",
        ],
        (TrendKind::CropProduction, TrendDirection::Stable) => &[
            "Crop output is steady; expanding the field is the next lever",
        ],
        (TrendKind::AnimalProduction, TrendDirection::Increasing) => &[
            "Animal output is rising; consider another coop or barn",
        ],
        (TrendKind::AnimalProduction, TrendDirection::Decreasing) => &[
            "Animal products are dropping; pet and feed animals daily to keep mood up",
        ],
        (TrendKind::AnimalProduction, TrendDirection::Stable) => &[
            "Animal output is steady; upgraded buildings unlock better produce",
        ],
        (TrendKind::EarningsPerHour, TrendDirection::Increasing) => &[
            "Each hour of play is paying more; keep automating chores",
        ],
        (TrendKind::EarningsPerHour, TrendDirection::Decreasing) => &[
            "Time efficiency is falling; batch chores and cut walking distance",
        ],
        (TrendKind::EarningsPerHour, TrendDirection::Stable) => &[
            "Hourly earnings are flat; automation frees time for higher-value work",
        ],
    };

    let mut recommendations: Vec<String> = advice.iter().map(|s| s.to_string()).collect();
    if strength == TrendStrength::Weak {
        recommendations.push(format!(
            "{} swings a lot day to day; collect a few more days before acting on it",
            kind.label()
        ));
    }
    recommendations
}
