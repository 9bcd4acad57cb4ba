//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tree Janitor - Repair project trees produced by asset extraction
#[derive(Parser, Debug)]
#[command(name = "janitor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root to repair
    #[arg(short, long, global = true, env = "JANITOR_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Configuration file (defaults to <root>/janitor.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Write a commented janitor.toml into the project root
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Run the repair pipeline once
    ///
    /// Examples:
    ///   janitor run                 # Repair the current directory
    ///   janitor run --dry-run       # Show what would change
    ///   janitor run --json          # Machine-readable report
    Run {
        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List object references that are empty or broken
    Scan {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Wait for the extraction output to settle, then repair
    ///
    /// Exits after the first repair. When `rearm = true` is set under
    /// `[watch]`, every later extraction is repaired as well and the
    /// command runs until interrupted or `--max-polls` is reached.
    Watch {
        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Stop after this many polls even if nothing fired
        #[arg(long)]
        max_polls: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_with_global_flags() {
        let cli = Cli::parse_from(["janitor", "run", "--dry-run", "--root", "/tmp/p", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.root, PathBuf::from("/tmp/p"));
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                dry_run: true,
                json: false
            })
        );
    }

    #[test]
    fn watch_help_explains_rearm() {
        let cmd = Cli::command();
        let watch = cmd.find_subcommand("watch").unwrap();
        let help = watch.get_long_about().unwrap().to_string();
        assert!(help.contains("rearm = true"));
        assert!(help.contains("--max-polls"));
    }

    #[test]
    fn parse_watch_max_polls() {
        let cli = Cli::parse_from(["janitor", "watch", "--max-polls", "3"]);
        assert_eq!(
            cli.command,
            Some(Commands::Watch {
                dry_run: false,
                max_polls: Some(3)
            })
        );
    }
}
