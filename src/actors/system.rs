//! System monitoring agent
//!
//! Collects system and process metrics, logs threshold violations and keeps the results in a
//! bounded history.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{trace, warn};

use crate::{
    CollectionResult,
    alerts::AlertEvaluator,
    config::{Config, ThresholdConfig},
    history::{self, HistoryBuffer, HistoryReader},
    monitors::{collector::SystemCollector, source::MetricsSource},
};

use super::agent::{Agent, Processor, Schedule};

pub const SYSTEM_AGENT_NAME: &str = "system_monitoring";

/// Evaluates alerts and appends every result to the history
pub struct SystemProcessor {
    thresholds: ThresholdConfig,
    history: Arc<RwLock<HistoryBuffer<CollectionResult>>>,
}

impl SystemProcessor {
    pub fn new(
        thresholds: ThresholdConfig,
        history: Arc<RwLock<HistoryBuffer<CollectionResult>>>,
    ) -> Self {
        Self {
            thresholds,
            history,
        }
    }
}

#[async_trait]
impl Processor<CollectionResult> for SystemProcessor {
    async fn process(&mut self, result: CollectionResult) {
        let alerts = AlertEvaluator::evaluate(&result.sample, &self.thresholds);
        if !alerts.is_empty() {
            let messages: Vec<&str> = alerts.iter().map(|alert| alert.message.as_str()).collect();
            warn!("alerts triggered: {}", messages.join("; "));
        }

        let mut history = self.history.write().await;
        history.push(result);
        trace!("history holds {} of {} results", history.len(), history.capacity());
    }
}

pub type SystemMonitoringAgent = Agent<SystemCollector, SystemProcessor>;

impl SystemMonitoringAgent {
    /// Build the agent and the reader for its history
    pub fn from_config(
        config: &Config,
        source: Arc<dyn MetricsSource>,
    ) -> (Self, HistoryReader<CollectionResult>) {
        let (writer, reader) = history::shared(config.history_capacity);

        let agent = Agent::new(
            SYSTEM_AGENT_NAME,
            SystemCollector::new(source).with_top_processes(config.top_processes),
            SystemProcessor::new(config.thresholds, writer),
            Schedule::from(config),
        );

        (agent, reader)
    }
}
