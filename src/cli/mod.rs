//! CLI module for installr - command-line interface and subcommands.
//!
//! Provides the entry point with subcommands for running the backlog,
//! seeding a new backlog, and inspecting tool statuses.

pub mod commands;

pub use commands::Cli;
