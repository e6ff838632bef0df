#![recursion_limit = "256"]

mod cli;
mod application;
mod domain;
mod data;
mod ml;
mod infra;

use anyhow::Result;
use cli::Cli;
use clap::Parser;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("brats_seg=info")),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
