use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// How the harness brings up search-engine nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LauncherMode {
    /// Spawn the engine binary as a child process per node.
    Process,
    /// Run an in-process stand-in node (no engine install required).
    Stub,
}

/// Configuration for the embedded test cluster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Directory used as the cluster data root. Wiped once per test class
    /// at setup, never between individual test methods.
    pub data_root: String,
    /// Node launcher selection.
    pub launcher: LauncherMode,
    /// Path to the engine binary (process launcher only).
    pub binary: String,
    /// How long to wait for the cluster to report green health at startup.
    #[serde(with = "humantime_serde")]
    pub startup_timeout: Duration,
    /// Interval between health polls while waiting for green.
    #[serde(with = "humantime_serde")]
    pub health_poll_interval: Duration,
    /// Extra node settings passed through to the launcher as `key=value`.
    pub settings: HashMap<String, String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            data_root: "target/testcluster".to_string(),
            launcher: LauncherMode::Process,
            binary: "elasticsearch".to_string(),
            startup_timeout: Duration::from_secs(60),
            health_poll_interval: Duration::from_millis(500),
            settings: HashMap::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Embedded cluster configuration
    pub cluster: ClusterConfig,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file("searchlink.toml"))
            .merge(Env::prefixed("SEARCHLINK__").split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }

    /// Load configuration from an explicit file instead of `searchlink.toml`.
    pub fn load_from(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SEARCHLINK__").split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();

        assert_eq!(config.cluster.data_root, "target/testcluster");
        assert_eq!(config.cluster.launcher, LauncherMode::Process);
        assert_eq!(config.cluster.binary, "elasticsearch");
        assert_eq!(config.cluster.startup_timeout, Duration::from_secs(60));
        assert_eq!(
            config.cluster.health_poll_interval,
            Duration::from_millis(500)
        );
        assert!(config.cluster.settings.is_empty());
    }

    #[test]
    fn test_configless_operation() {
        // Defaults must extract without any config file present
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .extract::<Configuration>()
            .unwrap();

        assert_eq!(config.cluster.data_root, "target/testcluster");
    }

    #[test]
    fn test_env_var_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SEARCHLINK__CLUSTER__LAUNCHER", "stub");
            jail.set_env("SEARCHLINK__CLUSTER__DATA_ROOT", "target/other");
            jail.set_env("SEARCHLINK__CLUSTER__STARTUP_TIMEOUT", "5s");

            let config = Figment::from(Serialized::defaults(Configuration::default()))
                .merge(Env::prefixed("SEARCHLINK__").split("__"))
                .extract::<Configuration>()?;

            assert_eq!(config.cluster.launcher, LauncherMode::Stub);
            assert_eq!(config.cluster.data_root, "target/other");
            assert_eq!(config.cluster.startup_timeout, Duration::from_secs(5));
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_with_node_settings() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "searchlink.toml",
                r#"
                [cluster]
                launcher = "stub"

                [cluster.settings]
                "http.max_content_length" = "10mb"
                "#,
            )?;

            let config = Figment::from(Serialized::defaults(Configuration::default()))
                .merge(Toml::file("searchlink.toml"))
                .extract::<Configuration>()?;

            assert_eq!(config.cluster.launcher, LauncherMode::Stub);
            assert_eq!(
                config.cluster.settings.get("http.max_content_length"),
                Some(&"10mb".to_string())
            );
            Ok(())
        });
    }
}
