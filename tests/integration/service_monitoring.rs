//! Integration tests for HTTP service probes
//!
//! These tests use wiremock to simulate the monitored services.

use std::sync::Arc;

use hostwatch::{
    actors::health::HealthCheckAgent,
    config::{Config, ServiceProbeConfig},
    monitors::health::{HttpProbe, ServiceProbe},
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn service(name: &str, url: String) -> ServiceProbeConfig {
    ServiceProbeConfig {
        name: name.to_string(),
        url,
        timeout: 2,
        expected_status: vec![],
        body_pattern: None,
    }
}

async fn mock_endpoint(status: u16, body: &str) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&mock_server)
        .await;

    mock_server
}

#[tokio::test]
async fn test_probe_healthy_on_2xx() {
    let mock_server = mock_endpoint(204, "").await;

    let probe = HttpProbe::new(service("api", format!("{}/health", mock_server.uri()))).unwrap();
    let status = probe.check().await;

    assert_eq!(probe.name(), "api");
    assert!(status.healthy, "{}", status.description);
}

#[tokio::test]
async fn test_probe_unhealthy_on_server_error() {
    let mock_server = mock_endpoint(503, "maintenance").await;

    let probe = HttpProbe::new(service("api", format!("{}/health", mock_server.uri()))).unwrap();
    let status = probe.check().await;

    assert!(!status.healthy);
    assert!(status.description.contains("503"));
}

#[tokio::test]
async fn test_probe_expected_status() {
    let mock_server = mock_endpoint(404, "").await;

    let mut config = service("legacy", format!("{}/health", mock_server.uri()));
    config.expected_status = vec![404];
    let probe = HttpProbe::new(config).unwrap();

    assert!(probe.check().await.healthy);
}

#[tokio::test]
async fn test_probe_body_pattern() {
    let mock_server = mock_endpoint(200, r#"{"status":"ok","db":"degraded"}"#).await;

    let mut config = service("api", format!("{}/health", mock_server.uri()));
    config.body_pattern = Some(r#""status":\s*"ok""#.to_string());
    assert!(HttpProbe::new(config.clone()).unwrap().check().await.healthy);

    config.body_pattern = Some(r#""db":\s*"ok""#.to_string());
    let status = HttpProbe::new(config).unwrap().check().await;
    assert!(!status.healthy);
    assert!(status.description.contains("does not match"));
}

#[tokio::test]
async fn test_probe_unreachable_is_unhealthy() {
    // Nothing listens on the discard port
    let probe = HttpProbe::new(service("gone", "http://127.0.0.1:9/health".to_string())).unwrap();
    let status = probe.check().await;

    assert!(!status.healthy);
    assert!(status.description.contains("failed"));
}

#[tokio::test]
async fn test_health_agent_probes_configured_services() {
    let up = mock_endpoint(200, "ok").await;
    let down = mock_endpoint(500, "").await;

    let mut config = Config::default();
    config.health.services = vec![
        service("frontend", format!("{}/health", up.uri())),
        service("backend", format!("{}/health", down.uri())),
    ];
    config.validate().unwrap();

    let source = Arc::new(MockSource::new(10.0, 10.0));
    let (agent, health) = HealthCheckAgent::from_config(&config, source, vec![]).unwrap();
    let handle = agent.start();

    // Probe failures never fail the cycle
    handle.collect_now().await.unwrap();

    let status = health.get().await.unwrap();
    assert!(status.service_health["frontend"].healthy);
    assert!(!status.service_health["backend"].healthy);
    assert_eq!(status.failed_checks(), vec!["backend"]);

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.failed_cycles, 0);

    handle.stop().await;
    handle.stopped().await;
}
