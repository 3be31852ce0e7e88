//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - All REST endpoints return correct responses
//! - Missing data is reported as 404 / "unknown"
//! - Agent state is exposed

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use hostwatch::{
    actors::{
        agent::{Agent, AgentHandle, Schedule},
        health::{HealthCheckAgent, HealthReader},
    },
    api::{ApiState, spawn_api_server},
    config::Config,
    history,
    query::MonitorQuery,
};
use serde_json::Value;

use crate::helpers::*;

async fn spawn_test_api(query: MonitorQuery, agents: Vec<AgentHandle>) -> SocketAddr {
    let state = ApiState::new(query, agents);
    spawn_api_server("127.0.0.1:0".parse().unwrap(), state)
        .await
        .unwrap()
}

/// API over a running system agent and a health agent, one cycle each
async fn spawn_populated_api() -> (SocketAddr, Vec<AgentHandle>) {
    let source = Arc::new(MockSource::new(55.5, 40.0));
    let (system, history) = spawn_system_agent(source.clone(), Schedule::new(LONG, LONG), 10);

    let (health_agent, health) =
        HealthCheckAgent::from_config(&Config::default(), source, vec![]).unwrap();
    let health_handle = health_agent.start();

    system.stats().await.unwrap();
    health_handle.stats().await.unwrap();

    let agents = vec![system, health_handle];
    let addr = spawn_test_api(MonitorQuery::new(history, health), agents.clone()).await;
    (addr, agents)
}

async fn get_json(url: String) -> (StatusCode, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_index_and_redirect() {
    let (addr, _agents) = spawn_populated_api().await;

    let (status, body) = get_json(format!("http://{addr}/api/v1/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["message"].is_string());

    // reqwest follows the redirect
    let (status, redirected) = get_json(format!("http://{addr}/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redirected, body);
}

#[tokio::test]
async fn test_endpoints_without_data() {
    let (_writer, history) = history::shared(history::DEFAULT_CAPACITY);
    let addr = spawn_test_api(MonitorQuery::new(history, HealthReader::default()), vec![]).await;

    let (status, body) = get_json(format!("http://{addr}/api/v1/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, body) = get_json(format!("http://{addr}/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unknown");
    assert!(body["checks"].is_null());

    let (status, body) = get_json(format!("http://{addr}/api/v1/metrics/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["metrics"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_metrics_endpoints() {
    let (addr, _agents) = spawn_populated_api().await;

    let (status, body) = get_json(format!("http://{addr}/api/v1/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sample"]["cpu_percent"], 55.5);
    assert_eq!(body["sample"]["disk_usage"]["/"]["percent"], 50.0);
    assert_eq!(body["top_processes"][0]["pid"], 2);

    let (status, body) = get_json(format!("http://{addr}/api/v1/metrics/history?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["metrics"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _agents) = spawn_populated_api().await;

    let (status, body) = get_json(format!("http://{addr}/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
    assert_eq!(body["checks"]["system_health"]["memory"]["healthy"], true);
}

#[tokio::test]
async fn test_agents_endpoint() {
    let (addr, agents) = spawn_populated_api().await;

    let (status, body) = get_json(format!("http://{addr}/api/v1/agents")).await;
    assert_eq!(status, StatusCode::OK);

    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "system_monitoring");
    assert_eq!(listed[0]["state"], "running");
    assert_eq!(listed[0]["stats"]["completed_cycles"], 1);
    assert_eq!(listed[1]["name"], "health_check");

    agents[1].stop().await;
    agents[1].stopped().await;

    let (_, body) = get_json(format!("http://{addr}/api/v1/agents")).await;
    assert_eq!(body[1]["state"], "stopped");
    assert!(body[1]["stats"].is_null());
}

#[tokio::test]
async fn test_agents_endpoint_with_busy_agent() {
    let (_writer, history) = history::shared(history::DEFAULT_CAPACITY);
    let stuck = Agent::new("stuck", StuckCollector, NoopProcessor, Schedule::new(LONG, LONG)).start();
    let addr = spawn_test_api(
        MonitorQuery::new(history, HealthReader::default()),
        vec![stuck],
    )
    .await;

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(3),
        get_json(format!("http://{addr}/api/v1/agents")),
    )
    .await
    .expect("agents endpoint must not wait for a busy agent");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "stuck");
    assert_eq!(body[0]["state"], "running");
    assert!(body[0]["stats"].is_null());
}

#[tokio::test]
async fn test_system_info_endpoint() {
    let (_writer, history) = history::shared(history::DEFAULT_CAPACITY);
    let addr = spawn_test_api(MonitorQuery::new(history, HealthReader::default()), vec![]).await;

    let (status, body) = get_json(format!("http://{addr}/api/v1/system/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["cpu_count"].as_u64().unwrap() > 0);
    assert!(body["arch"].is_string());
}
