pub mod cli;
pub mod commands;
pub mod data;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod progress;
pub mod services;
pub mod state;

use clap::Parser;

pub async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    logging::init_tracing(cli.verbose);
    cli::execute(cli).await
}
