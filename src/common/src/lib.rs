pub mod config;

pub use config::Configuration;

/// Initialize test logging.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
