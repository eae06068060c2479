mod cli;
mod execute;

use clap::Parser;
use crate::cli::CLI;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()>{
    let cli = CLI::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    execute::execute(cli)
}
