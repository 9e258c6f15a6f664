#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

mod commands;
mod logging;

use clap::Parser;
use garn_core::pkg::{DEFAULT_MAX_DEPTH, DEFAULT_REGISTRY, REGISTRY_ENV};
use garn_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "garn")]
#[command(author, version, about = "A minimal npm-compatible package manager", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Registry base URL
    #[arg(long, global = true, value_name = "URL", env = REGISTRY_ENV, default_value = DEFAULT_REGISTRY)]
    registry: String,

    /// Give up when a dependency chain gets this deep
    #[arg(long, global = true, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve package.json dependencies and install them into node_modules
    Install,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory
    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    // Build config
    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_registry(cli.registry)
        .with_max_depth(cli.max_depth);

    match cli.command {
        Some(Commands::Version) => commands::version::run(),
        Some(Commands::Install) | None => {
            logging::init(config.verbosity, config.json_logs);
            commands::install::run(&config)
        }
    }
}
