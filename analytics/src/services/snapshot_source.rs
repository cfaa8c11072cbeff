//! Snapshot provider implementations
//!
//! `FileSnapshotProvider` reads a JSON export written by the game adapter.
//! `SyntheticSnapshotProvider` generates a deterministic farm for demos and
//! local runs when no export is at hand.

use std::path::PathBuf;

use async_trait::async_trait;
use farmstats_shared::{component_debug, Component, DailyRecord, FarmSnapshot};
use tokio::fs;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::traits::SnapshotProvider;

/// Reads a `FarmSnapshot` from a JSON file on every call
pub struct FileSnapshotProvider {
    path: PathBuf,
}

impl FileSnapshotProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl SnapshotProvider for FileSnapshotProvider {
    async fn collect_snapshot(&self) -> AnalyticsResult<FarmSnapshot> {
        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| AnalyticsError::snapshot(format!("failed to read {}: {e}", self.path.display())))?;

        let snapshot: FarmSnapshot = serde_json::from_str(&content)
            .map_err(|e| AnalyticsError::snapshot(format!("malformed snapshot in {}: {e}", self.path.display())))?;

        component_debug!(
            Component::Provider,
            day = snapshot.day,
            history = snapshot.history.len(),
            "📥 Loaded snapshot from {}",
            self.path.display()
        );
        Ok(snapshot)
    }
}

/// Steadily growing farm with a small repeating wobble
pub struct SyntheticSnapshotProvider {
    days: u32,
}

impl SyntheticSnapshotProvider {
    pub fn new(days: u32) -> Self {
        Self { days }
    }

    pub fn record(day: u32) -> DailyRecord {
        let d = u64::from(day);
        DailyRecord {
            day,
            earnings: 400 + 60 * d + (d % 3) * 25,
            crops_harvested: 20 + 2 * d,
            animal_products: 5 + d / 2,
            hours_played: 2.5 + f64::from(day % 4) * 0.25,
        }
    }

    pub fn snapshot(&self) -> FarmSnapshot {
        let history = (1..=self.days).map(Self::record).collect();
        FarmSnapshot::from_history(history, 4 + self.days / 7, 2, 6)
    }
}

#[async_trait]
impl SnapshotProvider for SyntheticSnapshotProvider {
    async fn collect_snapshot(&self) -> AnalyticsResult<FarmSnapshot> {
        Ok(self.snapshot())
    }
}
