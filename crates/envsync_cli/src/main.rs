use clap::{Parser, Subcommand};

mod commands;
mod config;
mod errors;

use commands::sync_cmd::{self, SyncArgs};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// envsync CLI: Keep the deployment environments of a GitHub repository in line with a settings file
#[derive(Parser)]
#[command(name = "envsync")]
#[command(about = "Reconcile GitHub deployment environments with a settings file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, update and delete environments so the repository matches the settings file
    #[command()]
    Sync(SyncArgs),

    /// Show the CLI version
    Version,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().pretty().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("ENVSYNC_LOG"))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Sync(args) => match sync_cmd::execute(args).await {
            Ok(result) => {
                print!("{}", result.output);
                std::process::exit(result.exit_code);
            }
            Err(e) => {
                error!("Error: {e}");
                eprintln!("Error: {e}");
                std::process::exit(2);
            }
        },
        Commands::Version => {
            println!(
                "envsync version {}",
                option_env!("ENVSYNC_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            );
            std::process::exit(0);
        }
    }
}
