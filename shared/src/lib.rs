//! Shared types for the farm statistics analytics system
//!
//! Contains the data that crosses the analytics core boundary: raw farm
//! snapshots handed in by the host adapter, the configuration surface and
//! the logging setup used by every component.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

pub use config::{AnalysisConfig, AnalyticsConfig, BenchmarkProfile, CacheConfig, SchedulerConfig};
pub use errors::*;
pub use logging::Component;
pub use types::*;
