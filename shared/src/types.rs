//! Core shared types and identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a queued unit of work
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItemId(Uuid);

impl WorkItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for WorkItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded value of a series. `timestamp` is the absolute game day.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: u64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: u64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Totals recorded for a single in-game day
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub day: u32,
    pub earnings: u64,
    pub crops_harvested: u64,
    pub animal_products: u64,
    pub hours_played: f64,
}

/// Flat record of the farm's current totals plus its daily history.
///
/// Produced by the host adapter; the analytics core never mutates it.
/// `history` is ordered oldest to newest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FarmSnapshot {
    pub captured_at: DateTime<Utc>,
    pub day: u32,
    pub total_earnings: u64,
    pub crops_harvested: u64,
    pub animal_products: u64,
    pub animal_count: u32,
    pub crop_varieties: u32,
    pub animal_varieties: u32,
    pub play_time_hours: f64,
    #[serde(default)]
    pub history: Vec<DailyRecord>,
}

impl FarmSnapshot {
    /// Build a snapshot whose totals are the sums of the given history
    pub fn from_history(history: Vec<DailyRecord>, crop_varieties: u32, animal_varieties: u32, animal_count: u32) -> Self {
        let day = history.last().map(|record| record.day).unwrap_or(0);
        Self {
            captured_at: Utc::now(),
            day,
            total_earnings: history.iter().map(|r| r.earnings).sum(),
            crops_harvested: history.iter().map(|r| r.crops_harvested).sum(),
            animal_products: history.iter().map(|r| r.animal_products).sum(),
            animal_count,
            crop_varieties,
            animal_varieties,
            play_time_hours: history.iter().map(|r| r.hours_played).sum(),
            history,
        }
    }

    /// Build a time series from the daily history
    pub fn series<F>(&self, extractor: F) -> Vec<TimeSeriesPoint>
    where
        F: Fn(&DailyRecord) -> f64,
    {
        self.history
            .iter()
            .map(|record| TimeSeriesPoint::new(u64::from(record.day), extractor(record)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, earnings: u64) -> DailyRecord {
        DailyRecord {
            day,
            earnings,
            crops_harvested: 10,
            animal_products: 2,
            hours_played: 2.0,
        }
    }

    #[test]
    fn test_work_item_id_uniqueness() {
        let a = WorkItemId::new();
        let b = WorkItemId::new();
        assert_ne!(a, b);

        let parsed = WorkItemId::from_string(&a.to_string()).unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn test_snapshot_totals_from_history() {
        let snapshot = FarmSnapshot::from_history(vec![record(1, 100), record(2, 250)], 4, 1, 3);

        assert_eq!(snapshot.day, 2);
        assert_eq!(snapshot.total_earnings, 350);
        assert_eq!(snapshot.crops_harvested, 20);
        assert_eq!(snapshot.animal_products, 4);
        assert_eq!(snapshot.play_time_hours, 4.0);
    }

    #[test]
    fn test_series_preserves_order() {
        let snapshot = FarmSnapshot::from_history(vec![record(5, 10), record(6, 20), record(7, 30)], 1, 0, 0);
        let series = snapshot.series(|r| r.earnings as f64);

        let days: Vec<u64> = series.iter().map(|p| p.timestamp).collect();
        assert_eq!(days, vec![5, 6, 7]);
        assert_eq!(series[2].value, 30.0);
    }

    #[test]
    fn test_snapshot_deserializes_without_history() {
        let json = r#"{
            "captured_at": "2024-03-01T06:00:00Z",
            "day": 12,
            "total_earnings": 5000,
            "crops_harvested": 120,
            "animal_products": 30,
            "animal_count": 4,
            "crop_varieties": 6,
            "animal_varieties": 2,
            "play_time_hours": 10.5
        }"#;

        let snapshot: FarmSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.total_earnings, 5000);
    }
}
