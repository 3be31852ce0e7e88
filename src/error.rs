//! Error types for the monitoring pipeline
//!
//! Collection failures are transient and handled inside the agent loop. Shutdown timeouts are the only
//! failure reported back to the caller of the supervisor.

use std::fmt;

/// A failed collection cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// The metrics source could not be reached or sampled
    SourceUnavailable(String),

    /// The metrics source returned data that cannot be used
    MalformedData(String),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::SourceUnavailable(msg) => {
                write!(f, "metrics source unavailable: {}", msg)
            }
            CollectionError::MalformedData(msg) => write!(f, "malformed metrics data: {}", msg),
        }
    }
}

impl std::error::Error for CollectionError {}

impl From<tokio::task::JoinError> for CollectionError {
    fn from(err: tokio::task::JoinError) -> Self {
        CollectionError::SourceUnavailable(format!("sampling task failed: {}", err))
    }
}

/// A single partition or process that could not be read
///
/// This is not an error: the affected entry is dropped and the rest of the reading is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDataLoss {
    /// What could not be read (mount path, pid, ...)
    pub subject: String,

    /// Why it could not be read
    pub reason: String,
}

impl PartialDataLoss {
    pub fn new(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PartialDataLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped {}: {}", self.subject, self.reason)
    }
}

/// Agents that did not reach `Stopped` within the shutdown grace period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownTimeout {
    pub agents: Vec<String>,
}

impl fmt::Display for ShutdownTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} agent(s) failed to stop in time: {}",
            self.agents.len(),
            self.agents.join(", ")
        )
    }
}

impl std::error::Error for ShutdownTimeout {}
