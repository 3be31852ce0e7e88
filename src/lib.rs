pub mod actors;
pub mod alerts;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod monitors;
pub mod query;
pub mod util;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped system-wide reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    /// Usage per mount path, ordered by path.
    pub disk_usage: BTreeMap<String, DiskUsage>,
    /// Network counters summed over all interfaces.
    pub network_io: BTreeMap<String, u64>,
    pub process_count: u32,
    pub load_average: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

impl DiskUsage {
    /// Build a usage record from raw byte counts.
    ///
    /// Returns `None` for partitions that report no capacity (pseudo filesystems).
    pub fn from_space(total: u64, free: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }

        let used = total.saturating_sub(free);
        Some(Self {
            total,
            used,
            free,
            percent: used as f64 / total as f64 * 100.0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// A sample plus the top processes observed in the same cycle. This is the unit kept in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub sample: Sample,
    pub top_processes: Vec<ProcessSnapshot>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStatus {
    pub healthy: bool,
    pub description: String,
}

impl CheckStatus {
    pub fn new(healthy: bool, description: impl Into<String>) -> Self {
        Self {
            healthy,
            description: description.into(),
        }
    }
}

/// Result of one health-check cycle. Overwritten every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub system_health: BTreeMap<String, CheckStatus>,
    pub service_health: BTreeMap<String, CheckStatus>,
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    /// Names of all failing checks, system checks first.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.system_health
            .iter()
            .chain(self.service_health.iter())
            .filter(|(_, status)| !status.healthy)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_healthy(&self) -> bool {
        self.failed_checks().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub name: Option<String>,
    pub kernel_version: Option<String>,
    pub os_version: Option<String>,
    pub host_name: Option<String>,
    pub arch: String,
    pub cpu_count: usize,
    pub memory_total: u64,
    pub boot_time: u64,
}
