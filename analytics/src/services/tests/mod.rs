//! Service-specific tests
//!
//! Time-dependent tests run on a paused tokio clock so TTLs and budgets can
//! be exercised exactly.

#[cfg(test)]
mod cache_store;
#[cfg(test)]
mod task_scheduler;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use std::time::Duration;

    use farmstats_shared::{CacheConfig, SchedulerConfig};

    use crate::types::{TrendKind, TrendOutcome, WorkPayload};

    /// Small cache: emergency eviction at 8 entries, down to 7
    pub fn small_cache_config() -> CacheConfig {
        CacheConfig {
            max_size: 10,
            ..CacheConfig::default()
        }
    }

    pub fn scheduler_config(max_batch_size: usize, max_processing_time_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            max_batch_size,
            max_processing_time_ms,
            ..SchedulerConfig::default()
        }
    }

    pub fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    /// Cheap payload for executors that only need to succeed
    pub fn placeholder_payload() -> WorkPayload {
        WorkPayload::Trend(TrendOutcome::InsufficientData {
            kind: TrendKind::Earnings,
            available: 0,
            required: 3,
        })
    }
}
