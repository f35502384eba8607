//! Node launcher seam.
//!
//! The runner describes each node as a [`NodeConfig`] and hands it to a
//! [`NodeLauncher`], which brings the node up and returns a [`NodeHandle`]
//! used to stop it later. Two launchers exist: one spawning the real engine
//! binary per node, and an in-process stand-in so the harness's own tests
//! run without an engine install.

mod process;
mod stub;

pub use process::ProcessLauncher;
pub use stub::StubLauncher;

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::ClusterError;

/// Description of one node to bring up.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub cluster_name: String,
    /// 1-based node number within the cluster.
    pub node_number: usize,
    pub http_port: u16,
    pub transport_port: u16,
    /// Per-node data directory under the cluster data root.
    pub data_dir: PathBuf,
    /// Extra engine settings as `key=value` pairs.
    pub settings: HashMap<String, String>,
}

impl NodeConfig {
    /// Look up a setting, treating absent keys as unset.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

/// Handle to one running node.
#[async_trait]
pub trait NodeHandle: Send + Sync {
    /// Stop the node and release its resources.
    async fn close(&mut self) -> Result<(), ClusterError>;
}

/// Brings up nodes from their descriptions.
#[async_trait]
pub trait NodeLauncher: Send + Sync {
    async fn launch(&self, node: &NodeConfig) -> Result<Box<dyn NodeHandle>, ClusterError>;
}

/// Launcher selection for the cluster runner.
#[derive(Clone, Debug)]
pub enum LauncherConfig {
    /// Spawn the engine binary at the given path as a child process per node.
    Process { binary: PathBuf },
    /// Run an in-process stand-in node.
    Stub,
}

impl LauncherConfig {
    /// Create a process launcher configuration.
    pub fn process(binary: impl Into<PathBuf>) -> Self {
        Self::Process {
            binary: binary.into(),
        }
    }

    /// Create an in-process stub launcher configuration.
    pub fn stub() -> Self {
        Self::Stub
    }

    /// Create a launcher from the configuration.
    pub fn create_launcher(&self) -> Box<dyn NodeLauncher> {
        match self {
            LauncherConfig::Process { binary } => Box::new(ProcessLauncher::new(binary.clone())),
            LauncherConfig::Stub => Box::new(StubLauncher),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_config() {
        let config = LauncherConfig::process("/opt/engine/bin/engine");
        match config {
            LauncherConfig::Process { binary } => {
                assert_eq!(binary, PathBuf::from("/opt/engine/bin/engine"));
            }
            _ => panic!("Expected Process config"),
        }
    }

    #[test]
    fn test_node_setting_lookup() {
        let mut settings = HashMap::new();
        settings.insert("http.cors.enabled".to_string(), "true".to_string());
        let node = NodeConfig {
            cluster_name: "es-cl-run-1".to_string(),
            node_number: 1,
            http_port: 19200,
            transport_port: 19300,
            data_dir: PathBuf::from("target/testcluster/node1"),
            settings,
        };

        assert_eq!(node.setting("http.cors.enabled"), Some("true"));
        assert_eq!(node.setting("http.cors.allow-origin"), None);
    }
}
