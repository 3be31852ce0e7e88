//! Helper functions for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hostwatch::{
    CollectionResult, DiskUsage, ProcessSnapshot,
    actors::{
        agent::{Agent, AgentHandle, Processor, Schedule},
        system::SystemProcessor,
    },
    config::ThresholdConfig,
    error::{CollectionError, PartialDataLoss},
    history::{self, HistoryReader},
    monitors::{
        collector::{Collector, SystemCollector},
        source::{DiskReading, MetricsSource, ProcessReading, SystemReading},
    },
};

pub const LONG: Duration = Duration::from_secs(3600);

/// Scripted metrics source
///
/// Values can be changed while an agent is running. `fail_next(n)` makes the next `n` system
/// readings fail.
pub struct MockSource {
    reading: Mutex<SystemReading>,
    processes: Mutex<Vec<ProcessReading>>,
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new(cpu: f64, memory: f64) -> Self {
        Self {
            reading: Mutex::new(reading(cpu, memory, &[("/", 1000, 500)])),
            processes: Mutex::new(vec![process(1, "init", 0.5), process(2, "worker", 12.0)]),
            failures: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_reading(&self, reading: SystemReading) {
        *self.reading.lock().unwrap() = reading;
    }

    pub fn set_cpu(&self, cpu: f64) {
        self.reading.lock().unwrap().cpu_percent = cpu;
    }

    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for MockSource {
    async fn system(&self) -> Result<SystemReading, CollectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(CollectionError::SourceUnavailable("mock failure".to_string()));
        }

        Ok(self.reading.lock().unwrap().clone())
    }

    async fn processes(&self) -> Result<Vec<ProcessReading>, CollectionError> {
        Ok(self.processes.lock().unwrap().clone())
    }
}

/// A reading with the given mounts as `(path, total, free)`
pub fn reading(cpu: f64, memory: f64, mounts: &[(&str, u64, u64)]) -> SystemReading {
    SystemReading {
        cpu_percent: cpu,
        memory_percent: memory,
        disks: mounts
            .iter()
            .map(|(path, total, free)| DiskReading {
                mount_path: path.to_string(),
                usage: DiskUsage::from_space(*total, *free)
                    .ok_or_else(|| PartialDataLoss::new(*path, "no capacity reported")),
            })
            .collect(),
        network_io: BTreeMap::from([("bytes_sent".to_string(), 100), ("bytes_recv".to_string(), 200)]),
        process_count: 2,
        load_average: [0.1, 0.2, 0.3],
    }
}

pub fn process(pid: u32, name: &str, cpu: f64) -> ProcessReading {
    Ok(ProcessSnapshot {
        pid,
        name: name.to_string(),
        cpu_percent: cpu,
        memory_percent: 1.0,
    })
}

/// Start a system monitoring agent on `source` and return its handle and history
pub fn spawn_system_agent(
    source: Arc<MockSource>,
    schedule: Schedule,
    capacity: usize,
) -> (AgentHandle, HistoryReader<CollectionResult>) {
    let (writer, reader) = history::shared(NonZeroUsize::new(capacity).unwrap());

    let handle = Agent::new(
        "system_monitoring",
        SystemCollector::new(source),
        SystemProcessor::new(ThresholdConfig::default(), writer),
        schedule,
    )
    .start();

    (handle, reader)
}

/// Collector that never finishes a cycle
pub struct StuckCollector;

#[async_trait]
impl Collector for StuckCollector {
    type Output = ();

    async fn collect(&self) -> Result<(), CollectionError> {
        futures::future::pending().await
    }
}

pub struct NoopProcessor;

#[async_trait]
impl<T: Send + 'static> Processor<T> for NoopProcessor {
    async fn process(&mut self, _output: T) {}
}
