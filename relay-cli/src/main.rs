//! Binary crate for the `weather-relay` host simulator.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Acting as the host: dispatching lifecycle events and delivering
//!   relay messages to stdout

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod channel;
mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cmd = cli::Cli::parse();
    cmd.run().await
}

/// Logs go to stderr so that delivered messages on stdout stay parseable.
/// `RUST_LOG` overrides the default `info` level.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
