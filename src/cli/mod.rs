//! Command-line interface
//!
//! Offline front end for the engine: mix already-produced stems to a WAV
//! file, or inspect a stem without rendering anything.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Stemmix - offline stem mixing and inspection
#[derive(Parser, Debug)]
#[command(name = "stemmix")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mix one or more WAV stems into a single output file
    #[command(name = "render")]
    Render {
        /// Input stem files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Output sample rate in Hz
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,

        /// Output channel count
        #[arg(long, default_value_t = 2)]
        channels: usize,

        /// Skip EQ and sends (volume still applies)
        #[arg(long)]
        dry: bool,
    },

    /// Print duration and level statistics for a stem
    #[command(name = "probe")]
    Probe {
        /// Input WAV file
        input: PathBuf,
    },
}
