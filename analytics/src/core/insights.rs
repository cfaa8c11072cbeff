//! Dashboard scoring and insight rules
//!
//! Turns the sub-results of one dashboard cycle into section scores, an
//! overall score and human readable insights.

use crate::types::{ComparisonOutcome, Rating, TrendDirection, TrendKind, TrendOutcome};

pub const TREND_WEIGHT: f64 = 0.6;
pub const COMPARISON_WEIGHT: f64 = 0.4;

/// Score used for sections with nothing to judge
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Confidence above which a rising series becomes an insight
pub const RISING_CONFIDENCE: f64 = 0.7;
/// Confidence above which a falling series becomes a warning
pub const FALLING_CONFIDENCE: f64 = 0.5;

/// Score one trend section on 0..=100. Direction sets the side of 50,
/// confidence sets the distance from it.
pub fn trend_score(outcome: &TrendOutcome) -> f64 {
    match outcome.result() {
        Some(result) => match result.direction {
            TrendDirection::Increasing => NEUTRAL_SCORE + 50.0 * result.confidence,
            TrendDirection::Decreasing => NEUTRAL_SCORE - 50.0 * result.confidence,
            TrendDirection::Stable => NEUTRAL_SCORE,
        },
        None => NEUTRAL_SCORE,
    }
}

pub fn rating_score(rating: Rating) -> f64 {
    match rating {
        Rating::Excellent => 100.0,
        Rating::Good => 80.0,
        Rating::Average => 60.0,
        Rating::BelowAverage => 40.0,
        Rating::Poor => 20.0,
    }
}

pub fn comparison_score(outcome: &ComparisonOutcome) -> f64 {
    outcome.result().map_or(NEUTRAL_SCORE, |result| rating_score(result.rating))
}

fn mean_or_neutral(scores: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = scores.fold((0.0, 0usize), |(sum, count), score| (sum + score, count + 1));
    if count == 0 {
        NEUTRAL_SCORE
    } else {
        sum / count as f64
    }
}

/// Section subtotals for a dashboard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub trend: f64,
    pub comparison: f64,
    pub overall: f64,
}

pub fn score_dashboard(trends: &[TrendOutcome], comparisons: &[ComparisonOutcome]) -> ScoreBreakdown {
    let trend = mean_or_neutral(trends.iter().map(trend_score));
    let comparison = mean_or_neutral(comparisons.iter().map(comparison_score));
    let overall = (TREND_WEIGHT * trend + COMPARISON_WEIGHT * comparison).clamp(0.0, 100.0);

    ScoreBreakdown {
        trend,
        comparison,
        overall,
    }
}

/// Apply the threshold rules to every sub-result, in section order
pub fn key_insights(trends: &[TrendOutcome], comparisons: &[ComparisonOutcome], overall_score: f64) -> Vec<String> {
    let mut insights = Vec::new();

    for outcome in trends {
        match outcome {
            TrendOutcome::Trend(result) => {
                let percent = result.confidence * 100.0;
                match (result.kind, result.direction) {
                    (TrendKind::Earnings, TrendDirection::Increasing) if result.confidence > RISING_CONFIDENCE => {
                        insights.push(format!("📈 Profits are increasing steadily ({percent:.0}% confidence)"));
                    }
                    (TrendKind::Earnings, TrendDirection::Decreasing) if result.confidence > FALLING_CONFIDENCE => {
                        insights.push(format!("📉 Profits are declining ({percent:.0}% confidence); review crop choices"));
                    }
                    (TrendKind::CropProduction, TrendDirection::Increasing) if result.confidence > RISING_CONFIDENCE => {
                        insights.push(format!("🌱 Crop production is growing ({percent:.0}% confidence)"));
                    }
                    (TrendKind::EarningsPerHour, TrendDirection::Decreasing) if result.confidence > FALLING_CONFIDENCE => {
                        insights.push(format!("⏱️ Earnings per hour are slipping ({percent:.0}% confidence)"));
                    }
                    _ => {}
                }
            }
            TrendOutcome::InsufficientData { kind, available, required } => {
                insights.push(format!(
                    "ℹ️ Not enough data for {} yet ({available} of {required} days recorded)",
                    kind.label().to_lowercase()
                ));
            }
            TrendOutcome::Unavailable { kind, .. } => {
                insights.push(format!("⚠️ {} analysis is temporarily unavailable", kind.label()));
            }
        }
    }

    for outcome in comparisons {
        match outcome {
            ComparisonOutcome::Compared(result) => match result.rating {
                Rating::Excellent | Rating::Good => insights.push(format!(
                    "🏆 {} is {} compared to {} farms ({:+.1}%)",
                    result.kind.label(),
                    result.rating,
                    result.profile,
                    result.percentage_difference
                )),
                Rating::BelowAverage | Rating::Poor => insights.push(format!(
                    "⚠️ {} is {} compared to {} farms ({:+.1}%)",
                    result.kind.label(),
                    result.rating,
                    result.profile,
                    result.percentage_difference
                )),
                Rating::Average => {}
            },
            ComparisonOutcome::Unavailable { kind, .. } => {
                insights.push(format!("⚠️ {} comparison is temporarily unavailable", kind.label()));
            }
        }
    }

    if overall_score >= 80.0 {
        insights.push(format!("⭐ The farm is performing exceptionally well (score {overall_score:.0})"));
    } else if overall_score < 40.0 {
        insights.push(format!("🔧 The farm needs attention (score {overall_score:.0})"));
    }

    insights
}

/// Merge sub-result recommendations in section order, dropping duplicates
pub fn actionable_recommendations(trends: &[TrendOutcome], comparisons: &[ComparisonOutcome], limit: usize) -> Vec<String> {
    let candidates = comparisons
        .iter()
        .filter_map(ComparisonOutcome::result)
        .flat_map(|result| result.recommendations.iter())
        .chain(
            trends
                .iter()
                .filter_map(TrendOutcome::result)
                .flat_map(|result| result.recommendations.iter()),
        );

    let mut merged: Vec<String> = Vec::new();
    for recommendation in candidates {
        if merged.len() >= limit {
            break;
        }
        if !merged.contains(recommendation) {
            merged.push(recommendation.clone());
        }
    }
    merged
}
