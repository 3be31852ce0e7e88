//! Raw OS metrics
//!
//! `MetricsSource` is the boundary to the operating system. The default implementation samples the
//! local host with `sysinfo`; tests substitute scripted sources.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use sysinfo::{
    Disks, MINIMUM_CPU_UPDATE_INTERVAL, Networks, ProcessRefreshKind, ProcessesToUpdate, System,
};
use tracing::{instrument, trace};

use crate::{
    DiskUsage, PlatformInfo, ProcessSnapshot,
    error::{CollectionError, PartialDataLoss},
};

/// System-wide values read in one go
#[derive(Debug, Clone, PartialEq)]
pub struct SystemReading {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disks: Vec<DiskReading>,
    pub network_io: BTreeMap<String, u64>,
    pub process_count: u32,
    pub load_average: [f64; 3],
}

/// One partition. Partitions that cannot be read carry the reason instead of usage.
#[derive(Debug, Clone, PartialEq)]
pub struct DiskReading {
    pub mount_path: String,
    pub usage: Result<DiskUsage, PartialDataLoss>,
}

/// One process, or the reason it could not be read
pub type ProcessReading = Result<ProcessSnapshot, PartialDataLoss>;

#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Point-in-time system metrics
    async fn system(&self) -> Result<SystemReading, CollectionError>;

    /// All processes in enumeration order
    async fn processes(&self) -> Result<Vec<ProcessReading>, CollectionError>;
}

/// State kept between samples. CPU usage is computed as a delta between two refreshes.
struct Sampler {
    system: System,
    last_cpu_refresh: Option<Instant>,
}

impl Sampler {
    fn refresh_cpu(&mut self) {
        self.system.refresh_cpu_usage();

        let fresh = self
            .last_cpu_refresh
            .is_none_or(|last| last.elapsed() < MINIMUM_CPU_UPDATE_INTERVAL);
        if fresh {
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
            self.system.refresh_cpu_usage();
        }

        self.last_cpu_refresh = Some(Instant::now());
    }

    fn memory_percent(&self) -> Result<f64, CollectionError> {
        let total = self.system.total_memory();
        if total == 0 {
            return Err(CollectionError::MalformedData(
                "total memory reported as 0".to_string(),
            ));
        }

        Ok(self.system.used_memory() as f64 / total as f64 * 100.0)
    }

    fn read_system(&mut self) -> Result<SystemReading, CollectionError> {
        self.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing(),
        );

        let disks = Disks::new_with_refreshed_list()
            .iter()
            .map(|disk| {
                let mount_path = disk.mount_point().to_string_lossy().to_string();
                let usage = DiskUsage::from_space(disk.total_space(), disk.available_space())
                    .ok_or_else(|| PartialDataLoss::new(&mount_path, "no capacity reported"));

                DiskReading { mount_path, usage }
            })
            .collect();

        let load = System::load_average();

        Ok(SystemReading {
            cpu_percent: self.system.global_cpu_usage() as f64,
            memory_percent: self.memory_percent()?,
            disks,
            network_io: network_counters(&Networks::new_with_refreshed_list()),
            process_count: self.system.processes().len() as u32,
            load_average: [load.one, load.five, load.fifteen],
        })
    }

    fn read_processes(&mut self) -> Vec<ProcessReading> {
        self.system.refresh_memory();
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        let total_memory = self.system.total_memory();

        let mut processes: Vec<_> = self.system.processes().iter().collect();
        processes.sort_by_key(|(pid, _)| **pid);

        processes
            .into_iter()
            .map(|(pid, process)| {
                let cpu_percent = process.cpu_usage() as f64;
                if !cpu_percent.is_finite() {
                    return Err(PartialDataLoss::new(
                        format!("pid {pid}"),
                        "cpu usage unavailable",
                    ));
                }

                let memory_percent = if total_memory > 0 {
                    process.memory() as f64 / total_memory as f64 * 100.0
                } else {
                    0.0
                };

                Ok(ProcessSnapshot {
                    pid: pid.as_u32(),
                    name: process.name().to_string_lossy().to_string(),
                    cpu_percent,
                    memory_percent,
                })
            })
            .collect()
    }
}

fn network_counters(networks: &Networks) -> BTreeMap<String, u64> {
    let mut counters = BTreeMap::from([
        ("bytes_sent".to_string(), 0u64),
        ("bytes_recv".to_string(), 0),
        ("packets_sent".to_string(), 0),
        ("packets_recv".to_string(), 0),
        ("errin".to_string(), 0),
        ("errout".to_string(), 0),
    ]);

    for (_, data) in networks.iter() {
        let values = [
            ("bytes_sent", data.total_transmitted()),
            ("bytes_recv", data.total_received()),
            ("packets_sent", data.total_packets_transmitted()),
            ("packets_recv", data.total_packets_received()),
            ("errin", data.total_errors_on_received()),
            ("errout", data.total_errors_on_transmitted()),
        ];

        for (name, value) in values {
            if let Some(counter) = counters.get_mut(name) {
                *counter = counter.saturating_add(value);
            }
        }
    }

    counters
}

/// Samples the local host through `sysinfo`
///
/// Sampling blocks (CPU usage needs two refreshes some time apart), so every read runs on the blocking
/// thread pool.
#[derive(Clone)]
pub struct SysinfoSource {
    sampler: Arc<Mutex<Sampler>>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            sampler: Arc::new(Mutex::new(Sampler {
                system: System::new(),
                last_cpu_refresh: None,
            })),
        }
    }

    async fn with_sampler<T, F>(&self, read: F) -> Result<T, CollectionError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Sampler) -> Result<T, CollectionError> + Send + 'static,
    {
        let sampler = self.sampler.clone();

        tokio::task::spawn_blocking(move || {
            let mut sampler = sampler.lock().map_err(|_| {
                CollectionError::SourceUnavailable("sampler lock poisoned".to_string())
            })?;
            read(&mut *sampler)
        })
        .await?
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for SysinfoSource {
    #[instrument(skip(self))]
    async fn system(&self) -> Result<SystemReading, CollectionError> {
        let reading = self.with_sampler(Sampler::read_system).await?;
        trace!(
            "sampled system: cpu {:.1}%, memory {:.1}%, {} processes",
            reading.cpu_percent, reading.memory_percent, reading.process_count
        );
        Ok(reading)
    }

    #[instrument(skip(self))]
    async fn processes(&self) -> Result<Vec<ProcessReading>, CollectionError> {
        let processes = self
            .with_sampler(|sampler| Ok(sampler.read_processes()))
            .await?;
        trace!("sampled {} processes", processes.len());
        Ok(processes)
    }
}

impl PlatformInfo {
    /// Static information about the host. Blocks briefly while reading CPU and memory totals.
    pub fn gather() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();

        Self {
            name: System::name(),
            kernel_version: System::kernel_version(),
            os_version: System::os_version(),
            host_name: System::host_name(),
            arch: System::cpu_arch(),
            cpu_count: sys.cpus().len(),
            memory_total: sys.total_memory(),
            boot_time: System::boot_time(),
        }
    }
}
