//! Stemmix CLI
//!
//! Offline front end for the stem mixing engine.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stemmix::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .init();

    match cli.command {
        Some(Commands::Render {
            inputs,
            output,
            sample_rate,
            channels,
            dry,
        }) => commands::render(&inputs, &output, sample_rate, channels, dry)?,
        Some(Commands::Probe { input }) => commands::probe(&input)?,
        None => {
            println!("stemmix v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
        }
    }

    Ok(())
}
