use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cluster::{ClusterRunner, LauncherConfig};
use common::config::{Configuration, LauncherMode};
use testkit::ports;

/// Run a standalone dev cluster with the same lifecycle the tests use.
#[derive(Parser, Debug)]
#[command(
    name = "searchlink",
    about = "Local search-engine test cluster for connector development"
)]
struct Cli {
    /// Configuration file (defaults to searchlink.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP port (allocated dynamically when omitted)
    #[arg(long)]
    http_port: Option<u16>,

    /// Transport port (allocated dynamically when omitted)
    #[arg(long)]
    transport_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Configuration::load_from(path)?,
        None => Configuration::load()?,
    };
    let cluster_config = &config.cluster;

    let http_port = match cli.http_port {
        Some(port) => port,
        None => ports::next_available_port()?,
    };
    let transport_port = match cli.transport_port {
        Some(port) => port,
        None => ports::next_available_port()?,
    };

    let launcher = match cluster_config.launcher {
        LauncherMode::Process => LauncherConfig::process(&cluster_config.binary),
        LauncherMode::Stub => LauncherConfig::stub(),
    };

    let mut runner = ClusterRunner::builder()
        .cluster_name(format!("es-cl-dev-{}", std::process::id()))
        .base_http_port(http_port)
        .base_transport_port(transport_port)
        .data_root(&cluster_config.data_root)
        .settings(cluster_config.settings.clone())
        .launcher(launcher)
        .build();

    runner.start().await?;
    runner
        .ensure_green(
            cluster_config.startup_timeout,
            cluster_config.health_poll_interval,
        )
        .await?;

    info!("cluster ready at http://localhost:{http_port}");
    info!("press ctrl-c to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    runner.close().await?;
    Ok(())
}
