//! Launcher spawning the engine binary as a child process per node.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::{NodeConfig, NodeHandle, NodeLauncher};
use crate::error::ClusterError;

/// Spawns one engine process per node.
pub struct ProcessLauncher {
    binary: PathBuf,
}

impl ProcessLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl NodeLauncher for ProcessLauncher {
    async fn launch(&self, node: &NodeConfig) -> Result<Box<dyn NodeHandle>, ClusterError> {
        let mut command = Command::new(&self.binary);
        command
            .arg("-E")
            .arg(format!("cluster.name={}", node.cluster_name))
            .arg("-E")
            .arg(format!("node.name=node-{}", node.node_number))
            .arg("-E")
            .arg(format!("http.port={}", node.http_port))
            .arg("-E")
            .arg(format!("transport.port={}", node.transport_port))
            .arg("-E")
            .arg(format!("path.data={}", node.data_dir.display()));

        for (key, value) in &node.settings {
            command.arg("-E").arg(format!("{key}={value}"));
        }

        command
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        debug!(binary = %self.binary.display(), node = node.node_number, "spawning engine process");

        let child = command.spawn().map_err(|e| ClusterError::Launch {
            node: node.node_number,
            message: format!("{}: {e}", self.binary.display()),
        })?;

        info!(
            cluster = %node.cluster_name,
            node = node.node_number,
            http_port = node.http_port,
            "engine process started"
        );

        Ok(Box::new(ProcessNodeHandle { child }))
    }
}

struct ProcessNodeHandle {
    child: Child,
}

#[async_trait]
impl NodeHandle for ProcessNodeHandle {
    async fn close(&mut self) -> Result<(), ClusterError> {
        // kill() also reaps the child, so no zombie is left behind
        self.child.kill().await?;
        Ok(())
    }
}
