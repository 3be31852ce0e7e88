use std::time::Duration;

use axum::{Json, extract::State};
use futures::future::join_all;
use tracing::debug;

use crate::api::{state::ApiState, types::AgentInfo};

/// How long to wait for an agent busy in a cycle to report its stats
const STATS_TIMEOUT: Duration = Duration::from_millis(500);

/// GET /api/v1/agents
pub async fn list_agents(State(state): State<ApiState>) -> Json<Vec<AgentInfo>> {
    let agents = join_all(state.agents.iter().map(|handle| async move {
        let stats = match tokio::time::timeout(STATS_TIMEOUT, handle.stats()).await {
            Ok(stats) => stats.ok(),
            Err(_) => {
                debug!("agent {} did not report stats in time", handle.name());
                None
            }
        };

        AgentInfo {
            name: handle.name().to_string(),
            state: handle.state(),
            stats,
        }
    }))
    .await;

    Json(agents)
}
