//! Durable key-value storage for the ledger.
//!
//! A string-keyed, byte-valued slot store backed by `SQLite`. Row
//! sequences, timestamps, counts, and cached workbook binaries all live
//! in one table under fixed keys.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Durable slot store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a ledger database at the given path.
    ///
    /// Creates the parent directories and database file if they don't
    /// exist, and initializes the schema on first open.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening ledger database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::StorageOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps concurrent readers (e.g. a polling dashboard) cheap
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Ledger database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::StorageOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store bytes under a key, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO slots (key, value, written_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, written_at = excluded.written_at
            ",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read the bytes stored under a key, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Store a UTF-8 string under a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn put_text(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value.as_bytes())
    }

    /// Read the string stored under a key, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the value is not UTF-8.
    pub fn get_text(&self, key: &str) -> Result<Option<String>> {
        match self.get(key)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| Error::internal(format!("slot '{key}' holds non-UTF-8 text"))),
            None => Ok(None),
        }
    }

    /// Remove a key.
    ///
    /// Returns `true` if a value was removed, `false` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM slots WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    /// Count stored slots.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM slots", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether no slots are stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_open_in_memory() {
        assert!(Storage::open_in_memory().is_ok());
    }

    #[test]
    fn test_put_and_get() {
        let storage = create_test_storage();
        storage.put("registrations/tutor", b"[]").unwrap();

        let value = storage.get("registrations/tutor").unwrap();
        assert_eq!(value, Some(b"[]".to_vec()));
    }

    #[test]
    fn test_get_absent_key() {
        let storage = create_test_storage();
        assert_eq!(storage.get("missing").unwrap(), None);
    }

    #[test]
    fn test_put_replaces_previous_value() {
        let storage = create_test_storage();
        storage.put("snapshot", b"first").unwrap();
        storage.put("snapshot", b"second").unwrap();

        assert_eq!(storage.get("snapshot").unwrap(), Some(b"second".to_vec()));
        assert_eq!(storage.len().unwrap(), 1);
    }

    #[test]
    fn test_text_round_trip() {
        let storage = create_test_storage();
        storage.put_text("snapshot/updated_at", "2025-01-15T09:30:00Z").unwrap();

        assert_eq!(
            storage.get_text("snapshot/updated_at").unwrap(),
            Some("2025-01-15T09:30:00Z".to_string())
        );
    }

    #[test]
    fn test_get_text_on_binary_value() {
        let storage = create_test_storage();
        storage.put("workbook/tutor", &[0xff, 0xfe, 0x00, 0x80]).unwrap();

        assert!(storage.get_text("workbook/tutor").is_err());
    }

    #[test]
    fn test_remove() {
        let storage = create_test_storage();
        storage.put("snapshot", b"data").unwrap();

        assert!(storage.remove("snapshot").unwrap());
        assert!(!storage.remove("snapshot").unwrap());
        assert_eq!(storage.get("snapshot").unwrap(), None);
    }

    #[test]
    fn test_len_and_is_empty() {
        let storage = create_test_storage();
        assert!(storage.is_empty().unwrap());

        storage.put("a", b"1").unwrap();
        storage.put("b", b"2").unwrap();
        assert_eq!(storage.len().unwrap(), 2);
    }

    #[test]
    fn test_unicode_text() {
        let storage = create_test_storage();
        storage.put_text("note", "नमस्ते 🙏").unwrap();
        assert_eq!(storage.get_text("note").unwrap(), Some("नमस्ते 🙏".to_string()));
    }

    #[test]
    fn test_open_file_based_persists() {
        let db_path = std::env::temp_dir().join(format!("regbook_test_{}.db", std::process::id()));

        {
            let storage = Storage::open(&db_path).unwrap();
            storage.put_text("snapshot", "persisted").unwrap();
            assert_eq!(storage.path(), db_path);
        }

        let storage = Storage::open(&db_path).unwrap();
        assert_eq!(
            storage.get_text("snapshot").unwrap(),
            Some("persisted".to_string())
        );

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let nested = std::env::temp_dir().join(format!(
            "regbook_test_{}/nested/ledger.db",
            std::process::id()
        ));

        if let Some(parent) = nested.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let storage = Storage::open(&nested).unwrap();
        assert!(nested.exists());

        drop(storage);
        if let Some(parent) = nested.parent().and_then(Path::parent) {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
