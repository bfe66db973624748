//! Error types for regbook.
//!
//! One error enum covers the whole crate; every operation that can fail
//! returns the crate-wide [`Result`] alias.

use std::path::PathBuf;
use thiserror::Error;

use crate::form::Collection;

/// The main error type for regbook operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the ledger database.
    #[error("failed to open ledger database at {path}: {source}")]
    StorageOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A storage query failed.
    #[error("storage query failed: {0}")]
    StorageQuery(#[from] rusqlite::Error),

    /// Failed to run schema migrations.
    #[error("schema migration failed: {message}")]
    SchemaMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Ledger Errors ===
    /// A row's width does not match its collection's header.
    #[error("row for {collection} has {got} fields, header has {expected}")]
    RowShape {
        /// The collection being appended to.
        collection: Collection,
        /// Header width.
        expected: usize,
        /// Offered row width.
        got: usize,
    },

    // === Export Errors ===
    /// Workbook rendering failed.
    #[error("workbook rendering failed: {message}")]
    WorkbookRender {
        /// Description of what went wrong.
        message: String,
    },

    /// Writing an export file failed.
    #[error("failed to write export file {path}: {source}")]
    ExportWrite {
        /// Destination path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for regbook operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a workbook rendering error.
    #[must_use]
    pub fn workbook(message: impl Into<String>) -> Self {
        Self::WorkbookRender {
            message: message.into(),
        }
    }
}
