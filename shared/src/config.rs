//! Configuration surface for the analytics system
//!
//! Every section deserializes with defaults so a partial JSON file only has
//! to name the values it changes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::errors::{SharedError, SharedResult};

/// Cache store tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied when `set` is called without one
    pub default_ttl_secs: u64,
    pub max_size: usize,
    /// Fraction of `max_size` at which an insert triggers emergency eviction
    pub cleanup_threshold: f64,
    /// Fraction of `max_size` emergency eviction shrinks the store down to
    pub eviction_target: f64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 300,
            max_size: 1000,
            cleanup_threshold: 0.8,
            eviction_target: 0.7,
            sweep_interval_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Store size at which an insert triggers emergency eviction
    pub fn cleanup_trigger(&self) -> usize {
        (self.max_size as f64 * self.cleanup_threshold).floor() as usize
    }

    /// Store size emergency eviction shrinks down to
    pub fn eviction_floor(&self) -> usize {
        (self.max_size as f64 * self.eviction_target).floor() as usize
    }

    pub fn validate(&self) -> SharedResult<()> {
        if self.default_ttl_secs == 0 {
            return Err(SharedError::invalid_config("cache.default_ttl_secs", self.default_ttl_secs));
        }
        if self.max_size == 0 {
            return Err(SharedError::invalid_config("cache.max_size", self.max_size));
        }
        if !(self.cleanup_threshold > 0.0 && self.cleanup_threshold <= 1.0) {
            return Err(SharedError::invalid_config("cache.cleanup_threshold", self.cleanup_threshold));
        }
        if !(self.eviction_target > 0.0 && self.eviction_target < self.cleanup_threshold) {
            return Err(SharedError::invalid_config("cache.eviction_target", self.eviction_target));
        }
        if self.sweep_interval_secs == 0 {
            return Err(SharedError::invalid_config("cache.sweep_interval_secs", self.sweep_interval_secs));
        }
        Ok(())
    }
}

/// Background task scheduler budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub max_batch_size: usize,
    pub max_processing_time_ms: u64,
    pub tick_interval_ms: u64,
    /// Buffered batch events per subscriber before lagging ones drop old events
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 50,
            max_processing_time_ms: 100,
            tick_interval_ms: 1000,
            event_capacity: 64,
        }
    }
}

impl SchedulerConfig {
    pub fn max_processing_time(&self) -> Duration {
        Duration::from_millis(self.max_processing_time_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> SharedResult<()> {
        if self.max_batch_size == 0 {
            return Err(SharedError::invalid_config("scheduler.max_batch_size", self.max_batch_size));
        }
        if self.max_processing_time_ms == 0 {
            return Err(SharedError::invalid_config(
                "scheduler.max_processing_time_ms",
                self.max_processing_time_ms,
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(SharedError::invalid_config("scheduler.tick_interval_ms", self.tick_interval_ms));
        }
        if self.event_capacity == 0 {
            return Err(SharedError::invalid_config("scheduler.event_capacity", self.event_capacity));
        }
        Ok(())
    }
}

/// Per-analysis cache policy and presentation limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub trend_ttl_secs: u64,
    pub comparison_ttl_secs: u64,
    pub dashboard_ttl_secs: u64,
    pub default_profile: String,
    pub projection_horizon: usize,
    pub max_recommendations: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trend_ttl_secs: 600,
            comparison_ttl_secs: 900,
            dashboard_ttl_secs: 1200,
            default_profile: "average".to_string(),
            projection_horizon: 7,
            max_recommendations: 5,
        }
    }
}

impl AnalysisConfig {
    pub fn trend_ttl(&self) -> Duration {
        Duration::from_secs(self.trend_ttl_secs)
    }

    pub fn comparison_ttl(&self) -> Duration {
        Duration::from_secs(self.comparison_ttl_secs)
    }

    pub fn dashboard_ttl(&self) -> Duration {
        Duration::from_secs(self.dashboard_ttl_secs)
    }

    pub fn validate(&self) -> SharedResult<()> {
        for (field, value) in [
            ("analysis.trend_ttl_secs", self.trend_ttl_secs),
            ("analysis.comparison_ttl_secs", self.comparison_ttl_secs),
            ("analysis.dashboard_ttl_secs", self.dashboard_ttl_secs),
        ] {
            if value == 0 {
                return Err(SharedError::invalid_config(field, value));
            }
        }
        if self.default_profile.trim().is_empty() {
            return Err(SharedError::invalid_config("analysis.default_profile", "<empty>"));
        }
        Ok(())
    }
}

/// Named set of target metric averages used as comparison reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkProfile {
    pub name: String,
    /// Gold earned per hour of play
    pub earnings_per_hour: f64,
    /// Harvested crops plus animal products per hour of play
    pub efficiency: f64,
    /// Distinct crop and animal varieties
    pub diversity: f64,
    /// Daily earnings growth, percent of the mean daily earnings
    pub growth_potential: f64,
}

impl BenchmarkProfile {
    pub fn new(name: &str, earnings_per_hour: f64, efficiency: f64, diversity: f64, growth_potential: f64) -> Self {
        Self {
            name: name.to_string(),
            earnings_per_hour,
            efficiency,
            diversity,
            growth_potential,
        }
    }

    /// The built-in benchmark table
    pub fn defaults() -> Vec<BenchmarkProfile> {
        vec![
            BenchmarkProfile::new("beginner", 500.0, 20.0, 5.0, 2.0),
            BenchmarkProfile::new("average", 1500.0, 45.0, 12.0, 5.0),
            BenchmarkProfile::new("expert", 4000.0, 90.0, 25.0, 8.0),
        ]
    }
}

/// Complete configuration for the analytics runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
    pub analysis: AnalysisConfig,
    pub benchmarks: Vec<BenchmarkProfile>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            scheduler: SchedulerConfig::default(),
            analysis: AnalysisConfig::default(),
            benchmarks: BenchmarkProfile::defaults(),
        }
    }
}

impl AnalyticsConfig {
    pub fn from_json_str(json: &str) -> SharedResult<Self> {
        let config: AnalyticsConfig = serde_json::from_str(json).map_err(|e| SharedError::DeserializationError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> SharedResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_pretty(&self) -> SharedResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SharedError::SerializationError { message: e.to_string() })
    }

    /// Apply `FARMSTATS_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> SharedResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply `FARMSTATS_*` overrides from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> SharedResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("FARMSTATS_CACHE_MAX_SIZE") {
            self.cache.max_size = parse_override("FARMSTATS_CACHE_MAX_SIZE", &value)?;
        }
        if let Some(value) = lookup("FARMSTATS_CACHE_TTL_SECS") {
            self.cache.default_ttl_secs = parse_override("FARMSTATS_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = lookup("FARMSTATS_MAX_BATCH_SIZE") {
            self.scheduler.max_batch_size = parse_override("FARMSTATS_MAX_BATCH_SIZE", &value)?;
        }
        if let Some(value) = lookup("FARMSTATS_MAX_PROCESSING_TIME_MS") {
            self.scheduler.max_processing_time_ms = parse_override("FARMSTATS_MAX_PROCESSING_TIME_MS", &value)?;
        }
        if let Some(value) = lookup("FARMSTATS_TICK_INTERVAL_MS") {
            self.scheduler.tick_interval_ms = parse_override("FARMSTATS_TICK_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("FARMSTATS_DEFAULT_PROFILE") {
            self.analysis.default_profile = value;
        }
        self.validate()
    }

    pub fn validate(&self) -> SharedResult<()> {
        self.cache.validate()?;
        self.scheduler.validate()?;
        self.analysis.validate()?;

        if self.benchmarks.is_empty() {
            return Err(SharedError::invalid_config("benchmarks", "<empty>"));
        }
        let mut seen = HashSet::new();
        for profile in &self.benchmarks {
            if !seen.insert(profile.name.as_str()) {
                return Err(SharedError::invalid_config("benchmarks.name", &profile.name));
            }
        }
        if !seen.contains(self.analysis.default_profile.as_str()) {
            return Err(SharedError::invalid_config(
                "analysis.default_profile",
                &self.analysis.default_profile,
            ));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> SharedResult<T> {
    value.trim().parse().map_err(|_| SharedError::invalid_config(name, value))
}
