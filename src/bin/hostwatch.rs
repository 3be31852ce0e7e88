use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hostwatch::{
    actors::{
        agent::Launch, health::HealthCheckAgent, supervisor::AgentSupervisor,
        system::SystemMonitoringAgent,
    },
    config::Config,
    monitors::{
        health::{AgentStateProbe, ServiceProbe},
        source::{MetricsSource, SysinfoSource},
    },
    query::MonitorQuery,
    util::{env_lookup, get_log_level},
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Host metrics and health monitoring")]
struct Args {
    /// Config file (JSON or TOML). Defaults to ~/.config/hostwatch/config.toml if it exists.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run without the HTTP API
    #[arg(long)]
    no_api: bool,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![
        ("hostwatch", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_overrides(env_lookup)?;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init(get_log_level());

    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = load_config(&args)?;

    let source: Arc<dyn MetricsSource> = Arc::new(SysinfoSource::new());

    let (system_agent, history) = SystemMonitoringAgent::from_config(&config, source.clone());

    let probes: Vec<Box<dyn ServiceProbe>> = vec![Box::new(AgentStateProbe::monitoring_service(
        system_agent.state_watch(),
    ))];
    let (health_agent, health) = HealthCheckAgent::from_config(&config, source, probes)?;

    let mut supervisor = AgentSupervisor::new(MonitorQuery::new(history, health), config.grace());
    let agents: Vec<Box<dyn Launch>> = vec![Box::new(system_agent), Box::new(health_agent)];
    supervisor.start_all(agents);

    info!(
        "monitoring started: interval {}s, {} service probe(s)",
        config.collection_interval,
        config.health.services.len()
    );

    #[cfg(feature = "api")]
    if !args.no_api {
        use hostwatch::api::{ApiState, spawn_api_server};
        use std::net::SocketAddr;

        let state = ApiState::new(supervisor.query(), supervisor.handles().to_vec());
        let bind_addr = SocketAddr::new(config.api.host, config.api.port);
        spawn_api_server(bind_addr, state).await?;
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    if let Err(e) = supervisor.stop_all().await {
        error!("{e}");
    }

    Ok(())
}
