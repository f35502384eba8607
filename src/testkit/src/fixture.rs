//! Cluster fixture shared by all test methods of a test class.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::info;

use cluster::{ClusterRunner, LauncherConfig};
use common::config::{Configuration, LauncherMode};
use search_client::SearchClient;

use crate::pipeline::{PipelineContext, SearchComponent};
use crate::ports;

/// Scheme name the connector component is registered under.
pub const COMPONENT_NAME: &str = "search";

/// One embedded cluster plus its connected client, living from class setup
/// to class teardown.
///
/// Constructed once per test class and passed by reference into each test
/// method; its identity (cluster name, ports) never changes in between.
pub struct SearchClusterFixture {
    cluster_name: String,
    http_port: u16,
    transport_port: u16,
    runner: ClusterRunner,
    client: SearchClient,
}

impl SearchClusterFixture {
    /// Bring up the cluster for a test class.
    ///
    /// Wipes the configured data root, generates a time-seeded cluster name,
    /// allocates a transport and an HTTP port, starts one node with CORS
    /// open to all origins, blocks until the cluster reports green health,
    /// and connects a client to the HTTP port.
    ///
    /// Any failure aborts the whole test class; there is no retry. The data
    /// root is NOT wiped again between individual test methods (that keeps
    /// the class fast), so methods must not assume a pristine store.
    pub async fn set_up_once(config: &Configuration) -> Result<Self> {
        let cluster_config = &config.cluster;

        match tokio::fs::remove_dir_all(&cluster_config.data_root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).context(format!(
                    "failed to wipe data root {}",
                    cluster_config.data_root
                ));
            }
        }

        let cluster_name = format!("es-cl-run-{}", epoch_millis()?);

        let allocated = ports::next_available_ports(2)?;
        let (transport_port, http_port) = (allocated[0], allocated[1]);

        let launcher = match cluster_config.launcher {
            LauncherMode::Process => LauncherConfig::process(&cluster_config.binary),
            LauncherMode::Stub => LauncherConfig::stub(),
        };

        let mut runner = ClusterRunner::builder()
            .cluster_name(&cluster_name)
            .num_nodes(1)
            .base_http_port(http_port)
            .base_transport_port(transport_port)
            .data_root(&cluster_config.data_root)
            .settings(cluster_config.settings.clone())
            .setting("http.cors.enabled", "true")
            .setting("http.cors.allow-origin", "*")
            .launcher(launcher)
            .build();

        runner.start().await?;
        runner
            .ensure_green(
                cluster_config.startup_timeout,
                cluster_config.health_poll_interval,
            )
            .await?;

        let client = SearchClient::for_host_port("localhost", http_port);
        info!(cluster = %cluster_name, http_port, transport_port, "test cluster ready");

        Ok(Self {
            cluster_name,
            http_port,
            transport_port,
            runner,
            client,
        })
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn transport_port(&self) -> u16 {
        self.transport_port
    }

    /// Client connected to the cluster's HTTP endpoint.
    pub fn client(&self) -> &SearchClient {
        &self.client
    }

    /// `host:port` address of the node's REST endpoint.
    pub fn host_address(&self) -> String {
        format!("localhost:{}", self.http_port)
    }

    /// Pipeline context with the connector component registered against
    /// this cluster.
    ///
    /// Valid between setup and teardown only; registration itself does not
    /// touch the cluster.
    pub fn pipeline_context(&self) -> PipelineContext {
        let mut context = PipelineContext::new();
        context.register_component(COMPONENT_NAME, SearchComponent::new(self.host_address()));
        context
    }

    /// Tear the cluster down after all tests in the class ran.
    ///
    /// Closes the client first, then the runner. Both closes are attempted
    /// even if the first fails; the first failure is then propagated.
    /// Consuming `self` ends the fixture's lifecycle, so no further
    /// operations can go through it afterwards.
    pub async fn tear_down_once(self) -> Result<()> {
        let Self {
            mut runner,
            client,
            cluster_name,
            ..
        } = self;

        let client_result = client.close().await;
        let runner_result = runner.close().await;

        client_result.context("failed to close search client")?;
        runner_result.context("failed to close cluster runner")?;

        info!(cluster = %cluster_name, "test cluster torn down");
        Ok(())
    }
}

fn epoch_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?
        .as_millis())
}
