//! assetpress CLI - Content-addressed image asset optimizer for app projects.
//!
//! assetpress recompresses the PNG and JPEG assets of a project and records
//! every optimized file's digest in `.expo-shared/assets.json`, so unchanged
//! assets are never processed twice.
//!
//! # Usage
//!
//! ```bash
//! # Optimize every bundled asset in the current project
//! assetpress optimize
//!
//! # Optimize a subset at a lower quality
//! assetpress optimize ./my-app --include "assets/images/**/*" --quality 60
//!
//! # Exit non-zero if anything still needs optimizing
//! assetpress check
//!
//! # View configuration
//! assetpress config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// assetpress - Content-addressed image asset optimizer.
#[derive(Parser, Debug)]
#[command(name = "assetpress")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Recompress image assets that have not been optimized yet
    Optimize(cli::optimize::OptimizeArgs),

    /// Report whether any asset still needs optimizing
    Check(cli::check::CheckArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match assetpress_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `assetpress config path`."
            );
            assetpress_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("assetpress v{}", assetpress_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Optimize(args) => cli::optimize::execute(args, config).await,
        Commands::Check(args) => cli::check::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
