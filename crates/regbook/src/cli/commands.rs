//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::form::Collection;

/// Record a registration from a JSON submission.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// The collection to record into
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// Read the submission from this JSON file (stdin when omitted)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// List recorded registrations.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// The collection to list
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// Maximum number of rows to show (0 for all)
    #[arg(short, long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Export registrations to spreadsheet files.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Export only this collection (all collections when omitted)
    #[arg(value_enum)]
    pub collection: Option<CollectionArg>,

    /// Directory to write export files into (overrides configuration)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Also cache rendered workbook bytes into the ledger database
    #[arg(long)]
    pub cache: bool,
}

/// Show registration statistics.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Reset a collection to its header row.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// The collection to reset
    #[arg(value_enum)]
    pub collection: CollectionArg,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Run the periodic snapshot mirror until interrupted.
#[derive(Debug, Args)]
pub struct MirrorCommand {
    /// Seconds between snapshot ticks (overrides configuration)
    #[arg(short, long)]
    pub interval: Option<u64>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Collection argument for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CollectionArg {
    /// Tutor registrations
    Tutor,
    /// Partner-school registrations
    School,
    /// Parent/student registrations
    ParentStudent,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Tutor => Self::Tutor,
            CollectionArg::School => Self::School,
            CollectionArg::ParentStudent => Self::ParentStudent,
        }
    }
}
