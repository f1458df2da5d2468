mod commands;
mod config;
mod diagnostics;
mod error;
mod finder;
mod logging;
mod pinner;
mod resolver;
mod scanner;
mod store;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::UpdateOptions;

#[derive(Parser)]
#[command(
    name = "actpin",
    version,
    about = "Pin GitHub Actions to immutable commit hashes",
    long_about = "Rewrites `uses:` references in .github/workflows so each action is pinned to the \
                  commit its tag or branch currently points at. A tag can be moved after review; a \
                  commit hash cannot.",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List action references found in workflow files without changing anything
    Scan {
        /// Directory containing the .github/workflows folder
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Print the references as JSON
        #[arg(long)]
        json: bool,
        /// Print every reference instead of per-file counts
        #[arg(long)]
        verbose: bool,
    },
    /// Pin workflow action references to commit hashes
    Update {
        /// GitHub API base URL [env: GITHUB_API_URL]
        #[arg(long)]
        api_url: Option<String>,
        /// Directory containing the .github/workflows folder
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Time budget for the whole run, in seconds [default: 30]
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
        /// Log per-file processing and list processed files
        #[arg(long)]
        verbose: bool,
    },
    /// Show version and build information
    Version,
}

impl Commands {
    /// Whether the selected command asked for verbose output.
    const fn verbose(&self) -> bool {
        return match self {
            Self::Scan { verbose, .. } | Self::Update { verbose, .. } => *verbose,
            Self::Version => false,
        };
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.command.verbose());

    let result = match cli.command {
        Commands::Scan { dir, json, verbose } => commands::scan(&dir, verbose, json),
        Commands::Update { api_url, dir, timeout, verbose } => {
            let options = UpdateOptions { api_url, timeout, verbose };
            commands::update(&dir, &options).await
        },
        Commands::Version => {
            commands::version();
            Ok(())
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    }
}
