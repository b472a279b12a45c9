use anyhow::{anyhow, Result};
use tracing::Level;

/// Map the `-v` count to a maximum log level. Warnings and errors are
/// always shown.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Logs go to stderr so that stdout carries
/// only the report line.
pub fn init(verbosity: u8) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}
