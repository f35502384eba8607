//! Test support for the search connector.
//!
//! A test class brings up one embedded cluster through
//! [`SearchClusterFixture::set_up_once`], shares it across its test methods,
//! and tears it down with [`SearchClusterFixture::tear_down_once`]. Seeded
//! data is namespaced per test via [`indexed_data`] so the shared on-disk
//! store does not cause false positives between methods.

pub mod fixture;
pub mod namer;
pub mod pipeline;
pub mod ports;

pub use fixture::SearchClusterFixture;
pub use namer::{indexed_data, prefix_for};
pub use pipeline::{PipelineContext, SearchComponent};
pub use ports::{next_available_port, next_available_ports};

pub use common::init_test_logging;

use std::time::Duration;

use common::config::{Configuration, LauncherMode};
use tempfile::TempDir;

/// Create a test configuration with a temporary data root and the
/// in-process stub launcher.
pub fn create_test_config() -> (Configuration, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let mut config = Configuration::default();
    config.cluster.launcher = LauncherMode::Stub;
    config.cluster.data_root = temp_dir.path().join("testcluster").display().to_string();
    config.cluster.startup_timeout = Duration::from_secs(10);
    config.cluster.health_poll_interval = Duration::from_millis(50);

    (config, temp_dir)
}
