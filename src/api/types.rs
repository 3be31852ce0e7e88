//! API response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CollectionResult, HealthStatus,
    actors::messages::{AgentState, AgentStats},
};

/// Overall health as reported by the API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Unhealthy,
    /// No health check has completed yet
    Unknown,
}

impl OverallHealth {
    pub fn of(status: Option<&HealthStatus>) -> Self {
        match status {
            Some(status) if status.is_healthy() => OverallHealth::Healthy,
            Some(_) => OverallHealth::Unhealthy,
            None => OverallHealth::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: OverallHealth,
    pub timestamp: Option<DateTime<Utc>>,
    pub checks: Option<HealthStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub metrics: Vec<CollectionResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub state: AgentState,
    /// Absent once the agent has stopped or while it is stuck in a cycle
    pub stats: Option<AgentStats>,
}
