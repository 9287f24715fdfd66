//! Types that mirror the appliance's JSON schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub disk_percent: f32,
    pub disk_used_bytes: u64,
    pub disk_total_bytes: u64,
    // 0.0 means the sensor is unavailable on this hardware
    pub temperature_celsius: f32,
    pub uptime_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub system_health: HealthSample,
    pub active_meters: u32,
    pub total_meters: u32,
    pub active_chargers: u32,
    pub total_chargers: u32,
    pub last_collection: Option<DateTime<Utc>>,
    pub next_collection_minutes: i64,
    pub udp_listener_ports: Vec<u16>,
    pub recent_error_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAvailability {
    pub updates_available: bool,
    pub current_version_id: String,
    pub remote_version_id: String,
    pub change_log: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePhase {
    Idle,
    Starting,
    Running,
    Done,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProgress {
    pub phase: UpdatePhase,
    pub percent: u8,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupCreated {
    pub backup_name: String,
}
