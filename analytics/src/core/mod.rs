//! Core analysis logic
//!
//! Pure functions over plain data. Nothing in here performs I/O, locks or
//! touches the clock, so every result is reproducible from its inputs.

pub mod comparison;
pub mod insights;
pub mod trend;

pub use comparison::{percentage_difference, rate, ComparisonEngine, FarmMetrics};
pub use insights::{score_dashboard, ScoreBreakdown};
pub use trend::{linear_regression, TrendEngine};
