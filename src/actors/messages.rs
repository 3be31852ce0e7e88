//! Message types for agent communication
//!
//! Every agent owns an mpsc command channel. Requests that expect an answer carry a oneshot sender;
//! lifecycle state is published separately through a watch channel so it can be read without
//! messaging the agent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::CollectionError;

/// Lifecycle of an agent
///
/// ```text
/// Stopped ──start()──> Running ──stop()──> Stopping ──(in-flight cycle done)──> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Stopped,
    Running,
    Stopping,
}

/// Commands that can be sent to a running agent
#[derive(Debug)]
pub enum AgentCommand {
    /// Run one cycle immediately, outside the schedule
    CollectNow {
        respond_to: oneshot::Sender<Result<(), CollectionError>>,
    },

    /// Replace the normal interval
    ///
    /// The new interval takes effect from the next wait.
    UpdateInterval { interval: Duration },

    /// Get the cycle counters
    GetStats {
        respond_to: oneshot::Sender<AgentStats>,
    },

    /// Finish the in-flight cycle and exit
    Stop,
}

/// Cycle counters of an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub completed_cycles: u64,
    pub failed_cycles: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl AgentStats {
    pub(crate) fn record_success(&mut self) {
        self.completed_cycles += 1;
        self.last_success = Some(Utc::now());
    }

    pub(crate) fn record_failure(&mut self, error: &CollectionError) {
        self.failed_cycles += 1;
        self.last_error = Some(error.to_string());
    }
}
