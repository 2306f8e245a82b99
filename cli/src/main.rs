//! # Harness Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the `harness` CLI. It:
//! - parses command-line arguments with Clap,
//! - sets up `tracing` output from the `-v` count (or `RUST_LOG`),
//! - routes to the command handlers in `harness::commands`,
//! - prints any error and exits with status 1.
//!
//! ## Examples
//!
//! ```bash
//! # Archive a directory as a build context
//! harness pack ./site --output site.tar
//!
//! # Same, as zip, through the streaming producer, with debug logs
//! harness -vv pack ./site --format zip --output site.zip --stream
//!
//! # Bring all participants up for a minute, then snapshot and tear down
//! harness up --hold 60
//! ```
//!
use clap::Parser;
use harness::commands;
use tracing_subscriber::{fmt, EnvFilter};

/// Top-level command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "harness",
    about = "Archive packing and phased container fixtures for integration tests",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// All top-level commands.
#[derive(Parser, Debug)]
enum Commands {
    /// Archive a directory as tar, tar-gz or zip.
    #[command(alias = "p")]
    Pack(commands::pack::PackArgs),
    /// Render all participants and write a debug snapshot zip.
    Snapshot(commands::snapshot::SnapshotArgs),
    /// Start all participants, hold, snapshot and tear down.
    Up(commands::up::UpArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Pack(args) => commands::pack::handle_pack(args).await,
        Commands::Snapshot(args) => commands::snapshot::handle_snapshot(args).await,
        Commands::Up(args) => commands::up::handle_up(args).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
