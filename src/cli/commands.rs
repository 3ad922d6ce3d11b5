//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: process every eligible tool in the backlog
//! - init: seed a backlog file from source URLs
//! - status: show the backlog and last known statuses

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Installr - agent-driven tool installation orchestrator
#[derive(Parser, Debug)]
#[command(name = "installr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process every pending or failed tool in the backlog
    Run {
        /// Backlog file (overrides config)
        #[arg(short, long)]
        backlog: Option<PathBuf>,

        /// Artifact base directory (overrides config)
        #[arg(short, long)]
        artifacts_dir: Option<PathBuf>,

        /// Maximum concurrently live pipelines (overrides config)
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Total attempts per tool, initial attempt included (overrides config)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Use the built-in scripted agent and leave the backlog untouched
        #[arg(long)]
        dry_run: bool,
    },

    /// Create a new backlog file from source URLs
    Init {
        /// Backlog file to create
        #[arg(short, long)]
        backlog: Option<PathBuf>,

        /// Tool source URLs (one backlog row each)
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Show the backlog and each tool's last known status
    Status {
        /// Backlog file (overrides config)
        #[arg(short, long)]
        backlog: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::parse_from([
            "installr",
            "run",
            "--backlog",
            "tools.json",
            "--max-concurrent",
            "3",
            "--max-attempts",
            "2",
            "--dry-run",
        ]);

        match cli.command {
            Commands::Run {
                backlog,
                max_concurrent,
                max_attempts,
                dry_run,
                ..
            } => {
                assert_eq!(backlog, Some(PathBuf::from("tools.json")));
                assert_eq!(max_concurrent, Some(3));
                assert_eq!(max_attempts, Some(2));
                assert!(dry_run);
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_init_requires_urls() {
        assert!(Cli::try_parse_from(["installr", "init"]).is_err());

        let cli = Cli::parse_from(["installr", "init", "https://github.com/BurntSushi/ripgrep"]);
        match cli.command {
            Commands::Init { urls, .. } => assert_eq!(urls.len(), 1),
            other => panic!("expected init, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["installr", "--verbose", "--config", "custom.yml", "status"]);
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("custom.yml")));
    }
}
