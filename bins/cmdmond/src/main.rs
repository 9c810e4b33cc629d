use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cmdmon_core::{Collaborators, Listener};

use crate::config::Config;

mod config;

#[derive(Parser)]
struct Cli {
    /// Sets a custom config file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "/etc/cmdmond/cmdmond.toml"
    )]
    config: PathBuf,

    /// Enables verbose output on STDOUT
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let cfg = Config::from_file(cli.config)?;

    let listener = Listener::bind(&cfg.bind).await?;
    let mut collab = Collaborators::in_memory(cfg.max_sources);

    listener.run(&mut collab).await?;

    Ok(())
}
