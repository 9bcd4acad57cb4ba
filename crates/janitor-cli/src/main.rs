//! Tree Janitor CLI
//!
//! Repairs a project tree produced by an asset extraction tool.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: could not initialize logging: {}", "warning".yellow().bold(), e);
    }
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Some(cmd) => execute_command(cmd, &cli.root, cli.config.as_ref()),
        None => {
            println!("{} Tree Janitor", "janitor".green().bold());
            println!();
            println!("Run {} for available commands.", "janitor --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(
    cmd: Commands,
    root: &std::path::Path,
    config: Option<&std::path::PathBuf>,
) -> Result<()> {
    match cmd {
        Commands::Init { force } => commands::run_init(root, force),
        Commands::Run { dry_run, json } => commands::run_repair(root, config, dry_run, json),
        Commands::Scan { json } => commands::run_scan(root, config, json),
        Commands::Watch { dry_run, max_polls } => commands::run_watch(root, config, dry_run, max_polls),
    }
}
