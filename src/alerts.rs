//! Threshold alerting
//!
//! Alerts are informational: they are produced per cycle, logged, and dropped. A value that stays
//! above its threshold raises an event on every cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Sample, config::ThresholdConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Cpu,
    Memory,
    Disk,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Cpu => write!(f, "cpu"),
            AlertKind::Memory => write!(f, "memory"),
            AlertKind::Disk => write!(f, "disk"),
        }
    }
}

/// A single threshold violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,

    /// Only set for disk alerts
    pub mount_path: Option<String>,

    pub observed_value: f64,
    pub threshold: f64,
    pub message: String,
}

impl AlertEvent {
    fn cpu(observed_value: f64, threshold: f64) -> Self {
        Self {
            kind: AlertKind::Cpu,
            mount_path: None,
            observed_value,
            threshold,
            message: format!("High CPU usage: {observed_value:.1}%"),
        }
    }

    fn memory(observed_value: f64, threshold: f64) -> Self {
        Self {
            kind: AlertKind::Memory,
            mount_path: None,
            observed_value,
            threshold,
            message: format!("High memory usage: {observed_value:.1}%"),
        }
    }

    fn disk(mount_path: &str, observed_value: f64, threshold: f64) -> Self {
        Self {
            kind: AlertKind::Disk,
            mount_path: Some(mount_path.to_string()),
            observed_value,
            threshold,
            message: format!("High disk usage on {mount_path}: {observed_value:.1}%"),
        }
    }
}

/// Stateless evaluation of a sample against the configured thresholds
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator;

impl AlertEvaluator {
    /// Evaluate a sample.
    ///
    /// Events are ordered cpu, memory, then one event per violating mount in `disk_usage` order.
    /// A value exactly at its threshold does not alert.
    pub fn evaluate(sample: &Sample, thresholds: &ThresholdConfig) -> Vec<AlertEvent> {
        let mut events = vec![];

        if sample.cpu_percent > thresholds.cpu {
            events.push(AlertEvent::cpu(sample.cpu_percent, thresholds.cpu));
        }

        if sample.memory_percent > thresholds.memory {
            events.push(AlertEvent::memory(sample.memory_percent, thresholds.memory));
        }

        events.extend(
            sample
                .disk_usage
                .iter()
                .filter(|(_, usage)| usage.percent > thresholds.disk)
                .map(|(mount, usage)| AlertEvent::disk(mount, usage.percent, thresholds.disk)),
        );

        events
    }
}
