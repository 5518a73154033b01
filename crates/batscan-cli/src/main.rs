//! Batscan CLI - batch analysis of ultrasonic bat recordings.

mod commands;
mod pipeline;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "batscan")]
#[command(author, version, about = "Bat echolocation call analyzer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a recording or a folder of recordings
    Analyze(commands::analyze::AnalyzeArgs),

    /// Show recording header info, embedded metadata and sidecar labels
    Info(commands::info::InfoArgs),

    /// Generate synthetic test recordings
    Generate(commands::generate::GenerateArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Generate(args) => commands::generate::run(args),
    }
}
