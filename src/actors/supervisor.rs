//! AgentSupervisor - starts agents and stops them within a grace period

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::{error::ShutdownTimeout, query::MonitorQuery};

use super::agent::{AgentHandle, Launch};

/// Default time `stop_all` waits for agents to exit
pub const DEFAULT_GRACE: Duration = Duration::from_secs(10);

/// Owns the handles of all running agents and the read-only query accessors
pub struct AgentSupervisor {
    handles: Vec<AgentHandle>,
    query: MonitorQuery,
    grace: Duration,
}

impl AgentSupervisor {
    pub fn new(query: MonitorQuery, grace: Duration) -> Self {
        Self {
            handles: vec![],
            query,
            grace,
        }
    }

    /// Launch every agent as an independent task
    pub fn start_all(&mut self, agents: Vec<Box<dyn Launch>>) {
        for agent in agents {
            self.start(agent);
        }
    }

    pub fn start(&mut self, agent: Box<dyn Launch>) -> AgentHandle {
        debug!("starting agent {}", agent.name());
        let handle = agent.launch();
        self.handles.push(handle.clone());
        handle
    }

    pub fn handles(&self) -> &[AgentHandle] {
        &self.handles
    }

    pub fn query(&self) -> MonitorQuery {
        self.query.clone()
    }

    /// Signal every agent to stop and wait for all of them to exit
    ///
    /// Agents still running after the grace period are reported by name.
    #[instrument(skip(self), fields(agents = self.handles.len()))]
    pub async fn stop_all(&self) -> Result<(), ShutdownTimeout> {
        let grace = self.grace;
        let results = join_all(self.handles.iter().map(|handle| async move {
            let stopped = tokio::time::timeout(grace, async {
                handle.stop().await;
                handle.stopped().await;
            })
            .await
            .is_ok();

            (handle.name(), stopped)
        }))
        .await;

        let agents: Vec<String> = results
            .into_iter()
            .filter(|(_, stopped)| !stopped)
            .map(|(name, _)| name.to_string())
            .collect();

        if agents.is_empty() {
            info!("all agents stopped");
            Ok(())
        } else {
            let timeout = ShutdownTimeout { agents };
            warn!("{timeout}");
            Err(timeout)
        }
    }
}
