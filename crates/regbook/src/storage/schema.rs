//! `SQLite` schema definitions for the ledger database.

/// SQL statement to create the slots table holding all durable values.
///
/// Keys are fixed strings (row sequences, timestamps, counts, cached
/// workbooks); values are opaque bytes — JSON text and workbook
/// binaries share the table.
pub const CREATE_SLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS slots (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_SLOTS_TABLE, CREATE_METADATA_TABLE];
