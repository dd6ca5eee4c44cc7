//! CLI Module
//!
//! Command-line interface for the dtln denoiser.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dtln - real-time speech denoising
#[derive(Parser, Debug)]
#[command(name = "dtln")]
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
    /// Denoise a 16 kHz mono WAV file
    #[command(name = "denoise")]
    Denoise {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Samples fed to the denoiser per call, simulating a live stream
        #[arg(short, long, default_value_t = commands::DEFAULT_BLOCK_SIZE)]
        block_size: usize,

        /// Fail as soon as the engine falls behind real time
        #[arg(long)]
        strict: bool,

        /// Directory holding the engine library (overrides DTLN_ENGINE_DIR)
        #[arg(long)]
        engine_dir: Option<PathBuf>,
    },

    /// Show which engine library would be loaded on this platform
    #[command(name = "platform")]
    Platform {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Directory holding the engine library (overrides DTLN_ENGINE_DIR)
        #[arg(long)]
        engine_dir: Option<PathBuf>,
    },
}
