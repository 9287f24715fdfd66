//! Shared simulator state: synthetic telemetry, an audit-log ring, and the
//! scripted update run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::sync::Mutex;

use crate::types::{DeviceStatus, HealthSample, LogEntry, UpdateProgress};

const MEM_TOTAL: u64 = 2 * 1024 * 1024 * 1024;
const DISK_TOTAL: u64 = 32 * 1024 * 1024 * 1024;

// Ring caps so a long-lived simdev never grows without bound
const HISTORY_CAP: usize = 720;
const LOG_CAP: usize = 500;

// Seed actions chosen to land in every category of the console's taxonomy
const SEED_ACTIONS: &[(&str, Option<&str>)] = &[
    ("UDP listener started on port 7090", Some("collector ready")),
    ("Meter collection session opened", Some("12 meters")),
    ("Reading received from meter 4411", None),
    ("Charger session closed", Some("charger 2")),
    ("DNS resolve for cloud host succeeded", None),
    ("Auth token refreshed", None),
    ("Invoice export generated", Some("billing period 2026-07")),
    ("Backup completed", Some("nightly")),
    ("Meter collection failed: timeout", Some("meter 4409")),
    ("Reconnect after port change", Some("udp 7091")),
    ("login_failed from 10.0.0.17", None),
    ("Collection cycle complete", None),
];

pub struct Inner {
    pub started_at: DateTime<Utc>,
    pub history: Vec<HealthSample>,
    pub logs: Vec<LogEntry>,
    pub next_log_id: u64,
    pub update_applied_at: Option<Instant>,
    pub backups: Vec<String>,
    cpu_level: f32,
}

#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<Mutex<Inner>>,
    pub token: Option<String>,
    pub fail_update: bool,
}

impl AppState {
    pub fn new(token: Option<String>, fail_update: bool) -> Self {
        let now = Utc::now();
        let mut inner = Inner {
            started_at: now - Duration::hours(30),
            history: Vec::new(),
            logs: Vec::new(),
            next_log_id: 1,
            update_applied_at: None,
            backups: Vec::new(),
            cpu_level: 18.0,
        };
        // Backfill: one sample per 5 minutes over the last 6 hours
        for i in (0..72).rev() {
            let ts = now - Duration::minutes(5 * i);
            let sample = inner.sample_at(ts);
            inner.history.push(sample);
        }
        for (action, details) in SEED_ACTIONS {
            inner.push_log(action, details.map(str::to_string));
        }
        Self {
            inner: Arc::new(Mutex::new(inner)),
            token,
            fail_update,
        }
    }
}

impl Inner {
    fn sample_at(&mut self, ts: DateTime<Utc>) -> HealthSample {
        let mut rng = rand::thread_rng();
        // Random walk, bounded
        self.cpu_level = (self.cpu_level + rng.gen_range(-4.0..4.0)).clamp(3.0, 96.0);
        let mem_pct = rng.gen_range(34.0..48.0);
        let disk_pct = 61.0 + rng.gen_range(-0.5..0.5);
        let up = ts - self.started_at;
        HealthSample {
            timestamp: ts,
            cpu_percent: self.cpu_level,
            memory_percent: mem_pct,
            memory_used_bytes: (MEM_TOTAL as f64 * mem_pct as f64 / 100.0) as u64,
            memory_total_bytes: MEM_TOTAL,
            disk_percent: disk_pct,
            disk_used_bytes: (DISK_TOTAL as f64 * disk_pct as f64 / 100.0) as u64,
            disk_total_bytes: DISK_TOTAL,
            temperature_celsius: rng.gen_range(41.0..55.0),
            uptime_label: format!("{}d {}h", up.num_days(), up.num_hours() % 24),
        }
    }

    pub fn push_log(&mut self, action: &str, details: Option<String>) {
        let entry = LogEntry {
            id: self.next_log_id,
            created_at: Utc::now(),
            action: action.to_string(),
            details,
            ip_address: Some("10.0.0.5".into()),
        };
        self.next_log_id += 1;
        self.logs.push(entry);
        if self.logs.len() > LOG_CAP {
            self.logs.remove(0);
        }
    }

    pub fn current_status(&mut self) -> DeviceStatus {
        let now = Utc::now();
        let sample = self.sample_at(now);
        self.history.push(sample.clone());
        if self.history.len() > HISTORY_CAP {
            self.history.remove(0);
        }
        DeviceStatus {
            system_health: sample,
            active_meters: 11,
            total_meters: 12,
            active_chargers: 2,
            total_chargers: 2,
            last_collection: Some(now - Duration::minutes(7)),
            next_collection_minutes: 53,
            udp_listener_ports: vec![7090, 7091],
            recent_error_count: 1,
        }
    }

    /// Scripted run: ~1s starting, then running in 12%/s increments, done
    /// after ~9s. With fail_update set, reports an error at 40%.
    pub fn update_progress(&self, fail: bool) -> UpdateProgress {
        let Some(applied) = self.update_applied_at else {
            return UpdateProgress {
                phase: "idle",
                percent: 0,
                message: "no update in progress".into(),
                error: None,
            };
        };
        let secs = applied.elapsed().as_secs_f32();
        let percent = ((secs - 1.0).max(0.0) * 12.0).min(100.0) as u8;
        if fail && percent >= 40 {
            return UpdateProgress {
                phase: "error",
                percent: 40,
                message: "installing".into(),
                error: Some("disk full".into()),
            };
        }
        if secs < 1.0 {
            UpdateProgress {
                phase: "starting",
                percent: 0,
                message: "preparing update".into(),
                error: None,
            }
        } else if percent < 100 {
            UpdateProgress {
                phase: "running",
                percent,
                message: "installing".into(),
                error: None,
            }
        } else {
            UpdateProgress {
                phase: "done",
                percent: 100,
                message: "update installed".into(),
                error: None,
            }
        }
    }
}
