//! Embedded search-engine cluster runner for tests.
//!
//! Describes a small cluster (the harness uses a single node), brings its
//! nodes up through a [`launcher::NodeLauncher`], waits for green health
//! over the REST API, and tears the nodes down in reverse start order.

pub mod error;
pub mod launcher;

pub use error::ClusterError;
pub use launcher::{
    LauncherConfig, NodeConfig, NodeHandle, NodeLauncher, ProcessLauncher, StubLauncher,
};

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, error, info};

use search_client::{ClusterHealth, HealthStatus, SearchClient};

/// Builder for [`ClusterRunner`].
pub struct ClusterRunnerBuilder {
    cluster_name: String,
    num_nodes: usize,
    base_http_port: u16,
    base_transport_port: u16,
    data_root: PathBuf,
    settings: HashMap<String, String>,
    launcher: LauncherConfig,
}

impl Default for ClusterRunnerBuilder {
    fn default() -> Self {
        Self {
            cluster_name: "search-cluster".to_string(),
            num_nodes: 1,
            base_http_port: 19200,
            base_transport_port: 19300,
            data_root: PathBuf::from("target/testcluster"),
            settings: HashMap::new(),
            launcher: LauncherConfig::process("elasticsearch"),
        }
    }
}

impl ClusterRunnerBuilder {
    pub fn cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = name.into();
        self
    }

    pub fn num_nodes(mut self, num_nodes: usize) -> Self {
        self.num_nodes = num_nodes;
        self
    }

    /// HTTP port of the first node; node *n* listens on `base + n - 1`.
    pub fn base_http_port(mut self, port: u16) -> Self {
        self.base_http_port = port;
        self
    }

    /// Transport port of the first node; node *n* listens on `base + n - 1`.
    pub fn base_transport_port(mut self, port: u16) -> Self {
        self.base_transport_port = port;
        self
    }

    pub fn data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.data_root = data_root.into();
        self
    }

    /// Add one engine setting applied to every node.
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Merge a batch of engine settings applied to every node.
    pub fn settings(mut self, settings: HashMap<String, String>) -> Self {
        self.settings.extend(settings);
        self
    }

    pub fn launcher(mut self, launcher: LauncherConfig) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn build(self) -> ClusterRunner {
        let nodes = (1..=self.num_nodes)
            .map(|n| NodeConfig {
                cluster_name: self.cluster_name.clone(),
                node_number: n,
                http_port: self.base_http_port + (n as u16 - 1),
                transport_port: self.base_transport_port + (n as u16 - 1),
                data_dir: self.data_root.join(format!("node{n}")),
                settings: self.settings.clone(),
            })
            .collect();

        ClusterRunner {
            cluster_name: self.cluster_name,
            nodes,
            launcher: self.launcher.create_launcher(),
            handles: Vec::new(),
        }
    }
}

/// Manages the nodes of one embedded test cluster.
pub struct ClusterRunner {
    cluster_name: String,
    nodes: Vec<NodeConfig>,
    launcher: Box<dyn NodeLauncher>,
    handles: Vec<Box<dyn NodeHandle>>,
}

impl ClusterRunner {
    pub fn builder() -> ClusterRunnerBuilder {
        ClusterRunnerBuilder::default()
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// HTTP port of the given 1-based node number.
    pub fn http_port(&self, node_number: usize) -> Option<u16> {
        self.nodes.get(node_number - 1).map(|n| n.http_port)
    }

    /// Transport port of the given 1-based node number.
    pub fn transport_port(&self, node_number: usize) -> Option<u16> {
        self.nodes.get(node_number - 1).map(|n| n.transport_port)
    }

    pub fn is_started(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Bring up every node in order.
    ///
    /// If a node fails to launch, already launched nodes stay up so the
    /// caller can still `close` them.
    pub async fn start(&mut self) -> Result<(), ClusterError> {
        if self.is_started() {
            return Err(ClusterError::AlreadyStarted);
        }

        for node in &self.nodes {
            tokio::fs::create_dir_all(&node.data_dir).await?;
            let handle = self.launcher.launch(node).await?;
            self.handles.push(handle);
        }

        info!(cluster = %self.cluster_name, nodes = self.nodes.len(), "cluster started");
        Ok(())
    }

    /// Block until the cluster reports green health.
    pub async fn ensure_green(
        &self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<ClusterHealth, ClusterError> {
        if !self.is_started() {
            return Err(ClusterError::NotStarted);
        }

        let client = SearchClient::for_host_port("localhost", self.nodes[0].http_port);
        wait_for_green(&client, timeout, poll_interval).await
    }

    /// Close every node in reverse start order.
    ///
    /// Every node is closed even if an earlier close fails; the first
    /// failure is then propagated. Closing a never-started cluster is a
    /// no-op. On-disk node state is left in place.
    pub async fn close(&mut self) -> Result<(), ClusterError> {
        let mut first_error = None;

        for (i, mut handle) in self.handles.drain(..).enumerate().rev() {
            if let Err(e) = handle.close().await {
                error!(node = i + 1, error = %e, "node close failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

/// Poll the health endpoint until the cluster reports green.
///
/// Unreachable endpoints and non-green states both count as "not ready";
/// only the deadline turns them into an error.
pub async fn wait_for_green(
    client: &SearchClient,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<ClusterHealth, ClusterError> {
    let deadline = Instant::now() + timeout;

    loop {
        match client.cluster_health().await {
            Ok(health) if health.status == HealthStatus::Green => return Ok(health),
            Ok(health) => debug!(status = %health.status, "cluster not green yet"),
            Err(e) => debug!(error = %e, "health endpoint not reachable yet"),
        }

        if Instant::now() >= deadline {
            return Err(ClusterError::HealthTimeout { timeout });
        }
        sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[test]
    fn test_builder_port_layout() {
        let runner = ClusterRunner::builder()
            .cluster_name("es-cl-run-42")
            .num_nodes(3)
            .base_http_port(19200)
            .base_transport_port(19300)
            .data_root("target/testcluster")
            .build();

        assert_eq!(runner.cluster_name(), "es-cl-run-42");
        assert_eq!(runner.num_nodes(), 3);
        assert_eq!(runner.http_port(1), Some(19200));
        assert_eq!(runner.http_port(3), Some(19202));
        assert_eq!(runner.transport_port(2), Some(19301));
        assert_eq!(runner.http_port(4), None);
    }

    #[tokio::test]
    async fn test_ensure_green_requires_start() {
        let runner = ClusterRunner::builder()
            .launcher(LauncherConfig::stub())
            .build();

        let result = runner
            .ensure_green(Duration::from_secs(1), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(ClusterError::NotStarted)));
    }

    #[tokio::test]
    async fn test_close_before_start_is_noop() {
        let mut runner = ClusterRunner::builder()
            .launcher(LauncherConfig::stub())
            .build();

        assert!(!runner.is_started());
        runner.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_green_times_out() {
        // nothing listens on this port
        let client = SearchClient::for_host_port("localhost", free_port());

        let result = wait_for_green(
            &client,
            Duration::from_millis(250),
            Duration::from_millis(50),
        )
        .await;

        match result {
            Err(ClusterError::HealthTimeout { timeout }) => {
                assert_eq!(timeout, Duration::from_millis(250));
            }
            other => panic!("expected health timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_runner_lifecycle_with_stub_launcher() {
        let temp_dir = TempDir::new().unwrap();

        let mut runner = ClusterRunner::builder()
            .cluster_name("es-cl-run-lifecycle")
            .base_http_port(free_port())
            .base_transport_port(free_port())
            .data_root(temp_dir.path())
            .launcher(LauncherConfig::stub())
            .build();

        runner.start().await.unwrap();
        assert!(runner.is_started());

        let health = runner
            .ensure_green(Duration::from_secs(5), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(health.cluster_name, "es-cl-run-lifecycle");

        runner.close().await.unwrap();
        assert!(!runner.is_started());
    }
}
