use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `base_level`.
pub fn setup_logging(base_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .map_err(|e| anyhow::anyhow!("Invalid log filter: {}", e))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Logger initialization failed: {}", e))
}
