//! Read-only access to the monitoring data
//!
//! Every method returns a copy; callers never hold a lock on agent state.

use crate::{CollectionResult, HealthStatus, actors::health::HealthReader, history::HistoryReader};

#[derive(Clone)]
pub struct MonitorQuery {
    history: HistoryReader<CollectionResult>,
    health: HealthReader,
}

impl MonitorQuery {
    pub fn new(history: HistoryReader<CollectionResult>, health: HealthReader) -> Self {
        Self { history, health }
    }

    /// Most recent collection result, `None` before the first successful cycle
    pub async fn get_latest(&self) -> Option<CollectionResult> {
        self.history.latest().await
    }

    /// Up to `limit` most recent results, oldest first
    pub async fn get_history(&self, limit: usize) -> Vec<CollectionResult> {
        self.history.snapshot(limit).await
    }

    pub async fn get_health_status(&self) -> Option<HealthStatus> {
        self.health.get().await
    }
}
