use anyhow::Result;
use clap::Parser;

mod api;
mod cli;
mod config;
mod contracts;
mod engine;
mod monitoring;
mod notify;
mod rpc;
mod safe;
mod tasks;
mod wallet;

use cli::args::Cli;
use cli::context::{init_tracing, load_configuration};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_configuration(cli.config.clone())?;
    init_tracing(&config.logging)?;
    cli::run(cli, config).await
}
