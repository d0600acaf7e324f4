//! Karate Executor Agent
//!
//! Entry point the host invokes once per execution. Protocol lines go to
//! stdout; logs go to stderr.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod agent;

use agent::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::debug!("Karate executor agent v{}", karate_executor_common::VERSION);

    let stdout = std::io::stdout();
    if agent::run(&cli, stdout.lock()).is_err() {
        std::process::exit(1);
    }
}
