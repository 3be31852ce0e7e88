//! Health check agent
//!
//! Keeps only the latest `HealthStatus`; every successful cycle overwrites the previous one.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    HealthStatus,
    config::Config,
    monitors::health::{HealthCollector, HealthLimits, HttpProbe, ServiceProbe},
    monitors::source::MetricsSource,
};

use super::agent::{Agent, Processor, Schedule};

pub const HEALTH_AGENT_NAME: &str = "health_check";

/// Read-only access to the latest health status
#[derive(Clone, Default)]
pub struct HealthReader {
    status: Arc<RwLock<Option<HealthStatus>>>,
}

impl HealthReader {
    pub async fn get(&self) -> Option<HealthStatus> {
        self.status.read().await.clone()
    }
}

pub struct HealthProcessor {
    status: Arc<RwLock<Option<HealthStatus>>>,
}

impl HealthProcessor {
    /// Create a processor together with a reader of the status it writes
    pub fn shared() -> (Self, HealthReader) {
        let status = Arc::new(RwLock::new(None));
        let reader = HealthReader {
            status: status.clone(),
        };

        (Self { status }, reader)
    }
}

#[async_trait]
impl Processor<HealthStatus> for HealthProcessor {
    async fn process(&mut self, status: HealthStatus) {
        let failed = status.failed_checks();
        if failed.is_empty() {
            debug!("all health checks passed");
        } else {
            warn!("health checks failed: {}", failed.join(", "));
        }

        *self.status.write().await = Some(status);
    }
}

pub type HealthCheckAgent = Agent<HealthCollector, HealthProcessor>;

impl HealthCheckAgent {
    /// Build the agent with the system checks, the given probes and one HTTP probe per configured
    /// service
    pub fn from_config(
        config: &Config,
        source: Arc<dyn MetricsSource>,
        probes: Vec<Box<dyn ServiceProbe>>,
    ) -> anyhow::Result<(Self, HealthReader)> {
        let mut collector = HealthCollector::new(source, HealthLimits::from(&config.health));

        for probe in probes {
            collector = collector.with_boxed_probe(probe);
        }

        for service in &config.health.services {
            collector = collector.with_probe(HttpProbe::new(service.clone())?);
        }

        let mut names = HashSet::new();
        for name in collector.probe_names() {
            if !names.insert(name) {
                bail!("duplicate health probe name '{name}'");
            }
        }

        let (processor, reader) = HealthProcessor::shared();
        let agent = Agent::new(
            HEALTH_AGENT_NAME,
            collector,
            processor,
            Schedule::from(config),
        );

        Ok((agent, reader))
    }
}
