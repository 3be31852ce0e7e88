//! Health checks
//!
//! System checks are derived from a single source reading per cycle. Service checks are independent
//! probes; a failing probe marks its check unhealthy and never fails the cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use regex::Regex;
use tokio::sync::watch;
use tracing::{instrument, trace};

use crate::{
    CheckStatus, HealthStatus,
    actors::messages::AgentState,
    config::{HealthConfig, ServiceProbeConfig},
    error::CollectionError,
    monitors::{
        collector::Collector,
        source::{MetricsSource, SystemReading},
    },
};

pub const DISK_SPACE_CHECK: &str = "disk_space";
pub const MEMORY_CHECK: &str = "memory";
pub const MONITORING_SERVICE_CHECK: &str = "monitoring_service";

/// Usage levels (percent) at which the system checks fail
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthLimits {
    pub disk_critical: f64,
    pub memory_critical: f64,
}

impl Default for HealthLimits {
    fn default() -> Self {
        Self {
            disk_critical: 95.0,
            memory_critical: 95.0,
        }
    }
}

impl From<&HealthConfig> for HealthLimits {
    fn from(config: &HealthConfig) -> Self {
        Self {
            disk_critical: config.disk_critical,
            memory_critical: config.memory_critical,
        }
    }
}

/// Evaluate the system checks for one reading. Unreadable partitions are ignored.
pub fn system_checks(reading: &SystemReading, limits: &HealthLimits) -> BTreeMap<String, CheckStatus> {
    let disks_ok = reading
        .disks
        .iter()
        .filter_map(|disk| disk.usage.as_ref().ok())
        .all(|usage| usage.percent < limits.disk_critical);

    let memory_ok = reading.memory_percent < limits.memory_critical;

    BTreeMap::from([
        (
            DISK_SPACE_CHECK.to_string(),
            CheckStatus::new(disks_ok, "Disk space availability"),
        ),
        (
            MEMORY_CHECK.to_string(),
            CheckStatus::new(memory_ok, "Memory availability"),
        ),
    ])
}

/// A named service check
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> CheckStatus;
}

/// Healthy while the observed agent is running
pub struct AgentStateProbe {
    name: String,
    state: watch::Receiver<AgentState>,
}

impl AgentStateProbe {
    pub fn new(name: impl Into<String>, state: watch::Receiver<AgentState>) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }

    /// The `monitoring_service` check
    pub fn monitoring_service(state: watch::Receiver<AgentState>) -> Self {
        Self::new(MONITORING_SERVICE_CHECK, state)
    }
}

#[async_trait]
impl ServiceProbe for AgentStateProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> CheckStatus {
        let state = *self.state.borrow();
        CheckStatus::new(state == AgentState::Running, "Monitoring service status")
    }
}

/// Checks an HTTP endpoint
///
/// The check passes when the status code is accepted (any 2xx unless configured) and, if a body
/// pattern is configured, the body matches it.
pub struct HttpProbe {
    config: ServiceProbeConfig,
    body_pattern: Option<Regex>,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(config: ServiceProbeConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .context("failed to build HTTP client")?;

        let body_pattern = config
            .body_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .with_context(|| format!("invalid body pattern for service '{}'", config.name))?;

        Ok(Self {
            config,
            body_pattern,
            client,
        })
    }

    fn status_accepted(&self, status_code: u16) -> bool {
        if self.config.expected_status.is_empty() {
            (200..300).contains(&status_code)
        } else {
            self.config.expected_status.contains(&status_code)
        }
    }

    async fn execute_request(&self) -> anyhow::Result<(u16, String)> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .context("HTTP request failed")?;

        let status_code = response.status().as_u16();
        let body = if self.body_pattern.is_some() {
            response
                .text()
                .await
                .context("failed to read response body")?
        } else {
            String::new()
        };

        Ok((status_code, body))
    }
}

#[async_trait]
impl ServiceProbe for HttpProbe {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[instrument(skip(self), fields(service = %self.config.name))]
    async fn check(&self) -> CheckStatus {
        let url = &self.config.url;
        let start = Instant::now();

        let (status_code, body) = match self.execute_request().await {
            Ok(response) => response,
            Err(e) => {
                trace!("{url}: {e:#}");
                return CheckStatus::new(false, format!("GET {url} failed: {e:#}"));
            }
        };

        let elapsed_ms = start.elapsed().as_millis();

        if !self.status_accepted(status_code) {
            return CheckStatus::new(
                false,
                format!("GET {url} returned unexpected status {status_code}"),
            );
        }

        if let Some(pattern) = &self.body_pattern
            && !pattern.is_match(&body)
        {
            return CheckStatus::new(
                false,
                format!("GET {url} body does not match '{}'", pattern.as_str()),
            );
        }

        trace!("{url}: {status_code} in {elapsed_ms}ms");
        CheckStatus::new(true, format!("GET {url} returned {status_code} in {elapsed_ms}ms"))
    }
}

/// Produces one `HealthStatus` per cycle
pub struct HealthCollector {
    source: Arc<dyn MetricsSource>,
    limits: HealthLimits,
    probes: Vec<Box<dyn ServiceProbe>>,
}

impl HealthCollector {
    pub fn new(source: Arc<dyn MetricsSource>, limits: HealthLimits) -> Self {
        Self {
            source,
            limits,
            probes: vec![],
        }
    }

    pub fn with_probe(self, probe: impl ServiceProbe + 'static) -> Self {
        self.with_boxed_probe(Box::new(probe))
    }

    pub fn with_boxed_probe(mut self, probe: Box<dyn ServiceProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|probe| probe.name()).collect()
    }
}

#[async_trait]
impl Collector for HealthCollector {
    type Output = HealthStatus;

    #[instrument(skip(self))]
    async fn collect(&self) -> Result<HealthStatus, CollectionError> {
        let reading = self.source.system().await?;
        let system_health = system_checks(&reading, &self.limits);

        let service_health = join_all(self.probes.iter().map(|probe| async move {
            (probe.name().to_string(), probe.check().await)
        }))
        .await
        .into_iter()
        .collect();

        Ok(HealthStatus {
            system_health,
            service_health,
            timestamp: Utc::now(),
        })
    }
}
