//! Test fixtures for analytics tests
//!
//! Snapshot builders with known shapes so expected trends and ratings can be
//! asserted without recomputing them.

use farmstats_shared::{AnalyticsConfig, BenchmarkProfile, DailyRecord, FarmSnapshot};

pub struct TestFixtures;

impl TestFixtures {
    pub const DEFAULT_HORIZON: usize = 7;

    pub fn record(day: u32, earnings: u64, crops: u64, hours: f64) -> DailyRecord {
        DailyRecord {
            day,
            earnings,
            crops_harvested: crops,
            animal_products: 4,
            hours_played: hours,
        }
    }

    /// Earnings and crops rise every day, three hours of play per day
    pub fn growing_farm(days: u32) -> FarmSnapshot {
        let history = (1..=days)
            .map(|day| Self::record(day, 1000 + 250 * u64::from(day), 30 + 3 * u64::from(day), 3.0))
            .collect();
        FarmSnapshot::from_history(history, 8, 3, 10)
    }

    /// Earnings fall every day
    pub fn declining_farm(days: u32) -> FarmSnapshot {
        let history = (1..=days)
            .map(|day| Self::record(day, 5000 - 200 * u64::from(day), 40, 3.0))
            .collect();
        FarmSnapshot::from_history(history, 3, 1, 2)
    }

    pub fn two_day_farm() -> FarmSnapshot {
        Self::growing_farm(2)
    }

    /// Valid totals, but one day has a corrupt play time
    pub fn corrupted_hours_farm() -> FarmSnapshot {
        let mut snapshot = Self::growing_farm(10);
        snapshot.history[4].hours_played = f64::NAN;
        snapshot
    }

    pub fn config() -> AnalyticsConfig {
        AnalyticsConfig::default()
    }

    /// Config with a single custom benchmark that the growing farm beats
    pub fn custom_benchmark_config() -> AnalyticsConfig {
        let mut config = AnalyticsConfig::default();
        config.benchmarks = vec![BenchmarkProfile::new("club", 100.0, 5.0, 5.0, 1.0)];
        config.analysis.default_profile = "club".to_string();
        config
    }
}
