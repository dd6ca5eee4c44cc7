//! dtln CLI
//!
//! Command-line interface for the dtln streaming denoiser.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dtln::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("dtln v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("dtln v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Denoise {
            input,
            output,
            block_size,
            strict,
            engine_dir,
        } => commands::denoise(&input, &output, block_size, strict, engine_dir.as_deref()),
        Commands::Platform { json, engine_dir } => commands::platform(json, engine_dir.as_deref()),
    }
}
