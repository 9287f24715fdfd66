//! Bounded, deduplicated health history backing the console charts.
//!
//! The series is seeded once from the appliance's server-side backfill and
//! then extended by the live 5s poll. Both sources can describe the same
//! instant, so samples are deduplicated by a 10-second time bucket before
//! insertion (first writer wins).

use std::{fs, path::PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::HealthSample;

/// Maximum number of points retained (tail retention).
pub const MAX_POINTS: usize = 500;

/// Points older than this relative to the newest merge are dropped.
pub const WINDOW_HOURS: i64 = 24;

/// Width of the dedup bucket in seconds.
pub const BUCKET_SECS: i64 = 10;

/// Reduced chart form of a [`HealthSample`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthPoint {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub disk_percent: f32,
    pub temperature_celsius: f32,
}

impl From<&HealthSample> for HealthPoint {
    fn from(s: &HealthSample) -> Self {
        Self {
            timestamp: s.timestamp,
            cpu_percent: s.cpu_percent.clamp(0.0, 100.0),
            memory_percent: s.memory_percent.clamp(0.0, 100.0),
            disk_percent: s.disk_percent.clamp(0.0, 100.0),
            temperature_celsius: s.temperature_celsius,
        }
    }
}

// Nearest 10s bucket; seed and live samples that land in the same bucket
// are considered duplicates.
fn bucket(ts: DateTime<Utc>) -> i64 {
    (ts.timestamp() as f64 / BUCKET_SECS as f64).round() as i64
}

/// Time-ordered, bucket-unique, bounded series of [`HealthPoint`]s.
///
/// Every mutating call rebuilds and swaps the backing vector, so a reader
/// between calls always sees a complete series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthHistory {
    points: Vec<HealthPoint>,
}

impl HealthHistory {
    /// Build the initial series from the server-side backfill. Called once
    /// per session.
    pub fn seed(server_history: &[HealthSample], now: DateTime<Utc>) -> Self {
        let mut points: Vec<HealthPoint> = server_history.iter().map(HealthPoint::from).collect();
        points.sort_by_key(|p| p.timestamp);
        let mut seen: Option<i64> = None;
        // First writer wins within a bucket (points are sorted, so adjacent)
        points.retain(|p| {
            let b = bucket(p.timestamp);
            if seen == Some(b) {
                false
            } else {
                seen = Some(b);
                true
            }
        });
        let mut h = Self { points };
        h.trim(now);
        h
    }

    /// Append a freshly polled sample. Idempotent under duplicate delivery:
    /// a sample whose bucket is already occupied is dropped.
    pub fn merge_live(&mut self, sample: &HealthSample, now: DateTime<Utc>) {
        self.merge_point(HealthPoint::from(sample), now);
    }

    /// Merge one already-reduced point; used when overlaying the cached
    /// series from a previous run onto a fresh seed.
    pub fn merge_point(&mut self, point: HealthPoint, now: DateTime<Utc>) {
        let b = bucket(point.timestamp);
        if self.points.iter().any(|p| bucket(p.timestamp) == b) {
            return;
        }
        let mut next = self.points.clone();
        let idx = next.partition_point(|p| p.timestamp <= point.timestamp);
        next.insert(idx, point);
        self.points = next;
        self.trim(now);
    }

    /// Drop points outside the trailing window, then cap the count keeping
    /// the most recent points.
    pub fn trim(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::hours(WINDOW_HOURS);
        let mut next: Vec<HealthPoint> = self
            .points
            .iter()
            .copied()
            .filter(|p| p.timestamp >= cutoff)
            .collect();
        if next.len() > MAX_POINTS {
            next.drain(..next.len() - MAX_POINTS);
        }
        self.points = next;
    }

    pub fn points(&self) -> &[HealthPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&HealthPoint> {
        self.points.last()
    }
}

/// Where the console keeps a copy of the series between runs, so a freshly
/// opened session charts more than what it has polled itself.
pub trait HistoryRepository {
    /// Missing or corrupt data loads as an empty series, never an error.
    fn load(&self) -> HealthHistory;
    fn save(&self, history: &HealthHistory) -> std::io::Result<()>;
}

/// JSON file under the gridtop config dir (next to profiles.json).
pub struct FileHistoryRepository {
    path: PathBuf,
}

impl FileHistoryRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        crate::profiles::config_dir().join("history.json")
    }
}

impl HistoryRepository for FileHistoryRepository {
    fn load(&self) -> HealthHistory {
        match fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
            Err(_) => HealthHistory::default(),
        }
    }

    fn save(&self, history: &HealthHistory) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec(history).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}

/// In-memory repository for tests and `--demo` mode.
#[derive(Default)]
pub struct MemoryHistoryRepository {
    stored: std::sync::Mutex<Option<HealthHistory>>,
}

impl HistoryRepository for MemoryHistoryRepository {
    fn load(&self) -> HealthHistory {
        self.stored.lock().unwrap().clone().unwrap_or_default()
    }

    fn save(&self, history: &HealthHistory) -> std::io::Result<()> {
        *self.stored.lock().unwrap() = Some(history.clone());
        Ok(())
    }
}
