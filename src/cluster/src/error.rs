use std::time::Duration;

/// Errors from cluster lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// I/O error while preparing or tearing down a node
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A node failed to launch
    #[error("failed to launch node {node}: {message}")]
    Launch {
        /// 1-based node number within the cluster
        node: usize,
        message: String,
    },
    /// The cluster never reported green health
    #[error("cluster did not report green health within {timeout:?}")]
    HealthTimeout { timeout: Duration },
    /// A node failed to shut down cleanly
    #[error("node shutdown failed: {0}")]
    Shutdown(String),
    /// `start` was called on a running cluster
    #[error("cluster is already started")]
    AlreadyStarted,
    /// An operation that needs a running cluster was called before `start`
    #[error("cluster is not started")]
    NotStarted,
}
