//! Diagnostic logging setup.
//!
//! The library only emits `tracing` events; the binary installs a `fmt`
//! subscriber here. `RUST_LOG` wins over the configured filter. Wire lines
//! are logged at `trace` (`>>` inbound, `<<` outbound).

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the filter from `RUST_LOG`, falling back to `config.filter`.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|e| anyhow!("invalid log filter {:?}: {}", config.filter, e))
}

/// Install the global subscriber, writing to stderr so stdout stays clean
/// for command output.
pub fn init(config: &LoggingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}
