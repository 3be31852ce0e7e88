//! API shared state

use crate::{actors::agent::AgentHandle, query::MonitorQuery};

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Read-only access to history and health
    pub query: MonitorQuery,

    /// Handles of the running agents, for status reporting
    pub agents: Vec<AgentHandle>,
}

impl ApiState {
    pub fn new(query: MonitorQuery, agents: Vec<AgentHandle>) -> Self {
        Self { query, agents }
    }
}
