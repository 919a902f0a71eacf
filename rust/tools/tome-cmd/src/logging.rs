//! Diagnostic output for tome-cmd.
//!
//! The library crates log through the `log` facade; the subscriber installed here bridges
//! those records and writes them to stderr, filtered by `RUST_LOG` (default `warn`).

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {e}"))
}
