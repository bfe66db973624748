//! Command-line interface for the `regbook` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, CollectionArg, ConfigCommand, ExportCommand, ListCommand, MirrorCommand,
    ResetCommand, StatsCommand,
};

/// regbook - Local registration ledger
///
/// Records tutoring-network registrations (tutors, partner schools,
/// parents/students) into a local ledger, exports them as spreadsheets,
/// and can mirror a combined snapshot for other local consumers.
#[derive(Debug, Parser)]
#[command(name = "regbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a registration from a JSON submission
    Add(AddCommand),

    /// List recorded registrations
    List(ListCommand),

    /// Export registrations to spreadsheet files
    Export(ExportCommand),

    /// Show registration statistics
    Stats(StatsCommand),

    /// Reset a collection to its header row
    Reset(ResetCommand),

    /// Run the periodic snapshot mirror until interrupted
    Mirror(MirrorCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
