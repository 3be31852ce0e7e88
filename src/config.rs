use std::collections::HashSet;
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{monitors::health::MONITORING_SERVICE_CHECK, util};

/// Longest accepted `collection_interval` and `error_backoff`, one week
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between two collection cycles
    #[serde(default = "default_interval")]
    pub collection_interval: u64,

    /// Seconds to wait after a failed cycle before retrying
    #[serde(default = "default_error_backoff")]
    pub error_backoff: u64,

    /// Number of collection results kept in memory
    #[serde(default = "default_history_capacity")]
    pub history_capacity: NonZeroUsize,

    /// Number of processes kept per collection result
    #[serde(default = "default_top_processes")]
    pub top_processes: usize,

    #[serde(default)]
    pub thresholds: ThresholdConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub api: HttpConfig,

    /// Seconds the supervisor waits for agents to stop
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection_interval: default_interval(),
            error_backoff: default_error_backoff(),
            history_capacity: default_history_capacity(),
            top_processes: default_top_processes(),
            thresholds: ThresholdConfig::default(),
            health: HealthConfig::default(),
            api: HttpConfig::default(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// Alert thresholds in percent. An alert fires when a value is strictly above its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_cpu_threshold")]
    pub cpu: f64,
    #[serde(default = "default_memory_threshold")]
    pub memory: f64,
    #[serde(default = "default_disk_threshold")]
    pub disk: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu: default_cpu_threshold(),
            memory: default_memory_threshold(),
            disk: default_disk_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Disk usage (percent) at which the `disk_space` check fails
    #[serde(default = "default_critical")]
    pub disk_critical: f64,

    /// Memory usage (percent) at which the `memory` check fails
    #[serde(default = "default_critical")]
    pub memory_critical: f64,

    #[serde(default)]
    pub services: Vec<ServiceProbeConfig>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            disk_critical: default_critical(),
            memory_critical: default_critical(),
            services: vec![],
        }
    }
}

/// An HTTP endpoint probed by the health agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProbeConfig {
    pub name: String,
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub timeout: u64,

    /// Accepted status codes. Empty means any 2xx.
    #[serde(default)]
    pub expected_status: Vec<u16>,

    /// Regex the response body must match
    #[serde(default)]
    pub body_pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "util::get_default_host")]
    pub host: IpAddr,
    #[serde(default = "util::get_default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: util::get_default_host(),
            port: util::get_default_port(),
        }
    }
}

fn default_interval() -> u64 {
    30
}

fn default_error_backoff() -> u64 {
    5
}

fn default_history_capacity() -> NonZeroUsize {
    crate::history::DEFAULT_CAPACITY
}

fn default_top_processes() -> usize {
    10
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_cpu_threshold() -> f64 {
    80.0
}

fn default_memory_threshold() -> f64 {
    85.0
}

fn default_disk_threshold() -> f64 {
    90.0
}

fn default_critical() -> f64 {
    95.0
}

fn default_probe_timeout() -> u64 {
    5
}

impl Config {
    /// Load configuration from a file, the default location, or fall back to defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = path.map(Path::to_path_buf).or_else(|| {
            let default_path = default_config_path()?;
            default_path.exists().then_some(default_path)
        });

        match config_path {
            Some(path) => read_config_file(&path),
            None => {
                debug!("no configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply overrides from environment-style variables.
    ///
    /// `lookup` returns the raw value of a variable if it is set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(&lookup, util::COLLECTION_INTERVAL, &mut self.collection_interval)?;
        override_from(&lookup, util::ALERT_THRESHOLD_CPU, &mut self.thresholds.cpu)?;
        override_from(&lookup, util::ALERT_THRESHOLD_MEMORY, &mut self.thresholds.memory)?;
        override_from(&lookup, util::ALERT_THRESHOLD_DISK, &mut self.thresholds.disk)?;
        override_from(&lookup, util::API_HOST, &mut self.api.host)?;
        override_from(&lookup, util::API_PORT, &mut self.api.port)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.collection_interval == 0 {
            bail!("collection_interval must be greater than 0");
        }

        if self.error_backoff == 0 {
            bail!("error_backoff must be greater than 0");
        }

        if self.collection_interval > MAX_INTERVAL_SECS {
            bail!("collection_interval must be at most {MAX_INTERVAL_SECS} seconds");
        }

        if self.error_backoff > MAX_INTERVAL_SECS {
            bail!("error_backoff must be at most {MAX_INTERVAL_SECS} seconds");
        }

        check_percent("thresholds.cpu", self.thresholds.cpu)?;
        check_percent("thresholds.memory", self.thresholds.memory)?;
        check_percent("thresholds.disk", self.thresholds.disk)?;
        check_percent("health.disk_critical", self.health.disk_critical)?;
        check_percent("health.memory_critical", self.health.memory_critical)?;

        let mut names = HashSet::new();
        for service in &self.health.services {
            if service.name.trim().is_empty() {
                bail!("health service names must not be empty");
            }

            if service.name == MONITORING_SERVICE_CHECK {
                bail!("health service name '{MONITORING_SERVICE_CHECK}' is reserved");
            }

            if !names.insert(service.name.as_str()) {
                bail!("duplicate health service name '{}'", service.name);
            }

            if !(service.url.starts_with("http://") || service.url.starts_with("https://")) {
                bail!(
                    "health service '{}' has unsupported url '{}'",
                    service.name,
                    service.url
                );
            }
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }
}

fn override_from<F, T>(lookup: &F, name: &str, target: &mut T) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(name) {
        *target = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: '{raw}'"))?;
        trace!("{name} overridden from environment");
    }

    Ok(())
}

fn check_percent(name: &str, value: f64) -> anyhow::Result<()> {
    if !(0.0..=100.0).contains(&value) {
        bail!("{name} must be a percentage in [0, 100], got {value}");
    }

    Ok(())
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("hostwatch").join("config.toml"))
}

/// Read a JSON or TOML configuration file, chosen by extension
pub fn read_config_file(path: &Path) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config: Config = if is_json {
        serde_json::from_str(&file_content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?
    } else {
        toml::from_str(&file_content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?
    };

    trace!("loaded config: {config:?}");
    Ok(config)
}
