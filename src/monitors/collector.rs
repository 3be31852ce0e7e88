//! Collectors turn raw source readings into the records kept by the agents
//!
//! ```text
//! MetricsSource::system()    ──┐
//!                              ├─> validate, skip unreadable partitions ─> Sample ─┐
//! MetricsSource::processes() ──┘                                                   ├─> CollectionResult
//!                                 drop unreadable processes, stable sort, top N ───┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{instrument, trace};

use crate::{
    CollectionResult, ProcessSnapshot, Sample,
    error::CollectionError,
    monitors::source::{MetricsSource, ProcessReading, SystemReading},
};

/// Default number of processes kept per collection result
pub const DEFAULT_TOP_PROCESSES: usize = 10;

/// The "collect" half of an agent cycle
#[async_trait]
pub trait Collector: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn collect(&self) -> Result<Self::Output, CollectionError>;
}

/// Collects system metrics and the top processes by CPU usage
pub struct SystemCollector {
    source: Arc<dyn MetricsSource>,
    top_processes: usize,
}

impl SystemCollector {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self {
            source,
            top_processes: DEFAULT_TOP_PROCESSES,
        }
    }

    pub fn with_top_processes(mut self, top_processes: usize) -> Self {
        self.top_processes = top_processes;
        self
    }
}

#[async_trait]
impl Collector for SystemCollector {
    type Output = CollectionResult;

    #[instrument(skip(self))]
    async fn collect(&self) -> Result<CollectionResult, CollectionError> {
        let reading = self.source.system().await?;
        let processes = self.source.processes().await?;

        let sample = build_sample(reading, Utc::now())?;
        let top_processes = top_processes(processes, self.top_processes);

        trace!(
            "collected sample: cpu {:.1}%, memory {:.1}%, {} mounts, {} top processes",
            sample.cpu_percent,
            sample.memory_percent,
            sample.disk_usage.len(),
            top_processes.len()
        );

        Ok(CollectionResult {
            timestamp: sample.timestamp,
            sample,
            top_processes,
        })
    }
}

fn check_percent(name: &str, value: f64) -> Result<f64, CollectionError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CollectionError::MalformedData(format!(
            "{name} is not a valid percentage: {value}"
        )));
    }

    Ok(value)
}

/// Validate a raw reading and turn it into an immutable sample.
///
/// Unreadable partitions are dropped.
pub fn build_sample(
    reading: SystemReading,
    timestamp: DateTime<Utc>,
) -> Result<Sample, CollectionError> {
    let cpu_percent = check_percent("cpu_percent", reading.cpu_percent)?;
    let memory_percent = check_percent("memory_percent", reading.memory_percent)?;

    let disk_usage = reading
        .disks
        .into_iter()
        .filter_map(|disk| match disk.usage {
            Ok(usage) if usage.percent.is_finite() => Some((disk.mount_path, usage)),
            Ok(usage) => {
                trace!("skipped {}: invalid usage {}", disk.mount_path, usage.percent);
                None
            }
            Err(loss) => {
                trace!("{loss}");
                None
            }
        })
        .collect();

    Ok(Sample {
        timestamp,
        cpu_percent,
        memory_percent,
        disk_usage,
        network_io: reading.network_io,
        process_count: reading.process_count,
        load_average: reading.load_average,
    })
}

/// Highest `limit` processes by CPU usage, descending.
///
/// Ties keep enumeration order. Unreadable processes are dropped.
pub fn top_processes(readings: Vec<ProcessReading>, limit: usize) -> Vec<ProcessSnapshot> {
    let mut processes: Vec<ProcessSnapshot> = readings
        .into_iter()
        .filter_map(|reading| match reading {
            Ok(process) if process.cpu_percent.is_finite() => Some(process),
            Ok(process) => {
                trace!("skipped pid {}: invalid cpu usage", process.pid);
                None
            }
            Err(loss) => {
                trace!("{loss}");
                None
            }
        })
        .collect();

    // `sort_by` is stable
    processes.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
    processes.truncate(limit);
    processes
}
