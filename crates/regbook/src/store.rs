//! The local record store: durable accumulation of registration rows,
//! independent of process restarts.
//!
//! Each collection is an ordered row sequence whose first row is the
//! header. Appends rewrite the whole sequence under the collection's
//! storage key (total write, O(total rows) per call). Loads fail soft:
//! an absent or unparsable value yields an empty sequence, which is then
//! re-seeded with the header row. There is no cross-collection
//! atomicity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec;
use crate::error::{Error, Result};
use crate::form::{Collection, Row};
use crate::storage::Storage;

/// Durable store for the three registration collections.
#[derive(Debug)]
pub struct RecordStore {
    storage: Storage,
    tutor: Vec<Row>,
    school: Vec<Row>,
    parent_student: Vec<Row>,
}

impl RecordStore {
    /// Open the store over the given storage, loading every collection
    /// and seeding empty ones with their header row.
    #[must_use]
    pub fn open(storage: Storage) -> Self {
        let tutor = load_or_seed(&storage, Collection::Tutor);
        let school = load_or_seed(&storage, Collection::School);
        let parent_student = load_or_seed(&storage, Collection::ParentStudent);

        Self {
            storage,
            tutor,
            school,
            parent_student,
        }
    }

    /// The underlying slot storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// All rows of a collection, header first.
    #[must_use]
    pub fn rows(&self, collection: Collection) -> &[Row] {
        match collection {
            Collection::Tutor => &self.tutor,
            Collection::School => &self.school,
            Collection::ParentStudent => &self.parent_student,
        }
    }

    /// Data rows of a collection (header excluded).
    #[must_use]
    pub fn data_rows(&self, collection: Collection) -> &[Row] {
        let rows = self.rows(collection);
        rows.get(1..).unwrap_or_default()
    }

    /// Append one row and persist the whole sequence.
    ///
    /// Also rewrites the collection's last-update timestamp and
    /// data-row count slots. Writes to different collections carry no
    /// mutual ordering guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RowShape`] if the row's width does not match the
    /// collection's header, or a storage error if persisting fails.
    pub fn append(&mut self, collection: Collection, row: Row) -> Result<()> {
        let expected = codec::layout(collection).headers.len();
        if row.len() != expected {
            return Err(Error::RowShape {
                collection,
                expected,
                got: row.len(),
            });
        }

        self.rows_mut(collection).push(row);
        self.persist(collection)?;
        debug!(
            "Appended row to {collection}, now {} entries",
            self.data_rows(collection).len()
        );
        Ok(())
    }

    /// Replace a collection with its header row alone and persist.
    ///
    /// # Errors
    ///
    /// Returns a storage error if persisting fails.
    pub fn reset(&mut self, collection: Collection) -> Result<()> {
        *self.rows_mut(collection) = vec![codec::header_row(collection)];
        self.persist(collection)?;
        debug!("Reset {collection}");
        Ok(())
    }

    /// Drop the in-memory sequences and re-load every collection from
    /// durable storage.
    ///
    /// Used before export so a stale in-memory copy is never
    /// serialized. Load failures degrade to header-only sequences.
    pub fn refresh(&mut self) {
        self.tutor = load_or_seed(&self.storage, Collection::Tutor);
        self.school = load_or_seed(&self.storage, Collection::School);
        self.parent_student = load_or_seed(&self.storage, Collection::ParentStudent);
    }

    /// Per-collection counts and last-update timestamps.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let collections: Vec<CollectionStats> = Collection::ALL
            .into_iter()
            .map(|collection| CollectionStats {
                collection,
                data_rows: self.data_rows(collection).len(),
                updated_at: self.updated_at(collection),
            })
            .collect();
        let total_rows = collections.iter().map(|c| c.data_rows).sum();

        StoreStats {
            collections,
            total_rows,
        }
    }

    /// Last-update timestamp of a collection, if it was ever persisted.
    #[must_use]
    pub fn updated_at(&self, collection: Collection) -> Option<DateTime<Utc>> {
        let text = self.storage.get_text(&collection.updated_key()).ok()??;
        DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn rows_mut(&mut self, collection: Collection) -> &mut Vec<Row> {
        match collection {
            Collection::Tutor => &mut self.tutor,
            Collection::School => &mut self.school,
            Collection::ParentStudent => &mut self.parent_student,
        }
    }

    /// Total write of one collection: rows, timestamp, count.
    fn persist(&self, collection: Collection) -> Result<()> {
        let rows = self.rows(collection);
        let encoded = serde_json::to_vec(rows)?;
        self.storage.put(&collection.rows_key(), &encoded)?;
        self.storage
            .put_text(&collection.updated_key(), &Utc::now().to_rfc3339())?;
        self.storage.put_text(
            &collection.count_key(),
            &self.data_rows(collection).len().to_string(),
        )?;
        Ok(())
    }
}

/// Load a collection's rows, substituting the header row when the slot
/// is absent or unparsable. Never raises.
fn load_or_seed(storage: &Storage, collection: Collection) -> Vec<Row> {
    let rows = match storage.get(&collection.rows_key()) {
        Ok(Some(bytes)) => match serde_json::from_slice::<Vec<Row>>(&bytes) {
            Ok(rows) => rows,
            Err(err) => {
                warn!("Stored rows for {collection} are unparsable, starting empty: {err}");
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!("Failed to load {collection}, starting empty: {err}");
            Vec::new()
        }
    };

    if rows.is_empty() {
        vec![codec::header_row(collection)]
    } else {
        rows
    }
}

/// Counts and freshness for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    /// The collection.
    pub collection: Collection,
    /// Number of data rows (header excluded).
    pub data_rows: usize,
    /// When the collection was last persisted.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Counts and freshness across the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Per-collection statistics, in canonical collection order.
    pub collections: Vec<CollectionStats>,
    /// Total data rows across all collections.
    pub total_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Submission;

    fn create_test_store() -> RecordStore {
        RecordStore::open(Storage::open_in_memory().expect("failed to open storage"))
    }

    fn tutor_row(name: &str) -> Row {
        codec::encode(
            Collection::Tutor,
            &Submission::new().text("fullName", name),
        )
    }

    #[test]
    fn test_open_seeds_headers() {
        let store = create_test_store();
        for collection in Collection::ALL {
            let rows = store.rows(collection);
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0], codec::header_row(collection));
        }
    }

    #[test]
    fn test_append_n_rows_yields_n_plus_header() {
        let mut store = create_test_store();
        for i in 0..5 {
            store
                .append(Collection::Tutor, tutor_row(&format!("Tutor {i}")))
                .unwrap();
        }

        let rows = store.rows(Collection::Tutor);
        assert_eq!(rows.len(), 6);
        // submission order is preserved
        for (i, row) in store.data_rows(Collection::Tutor).iter().enumerate() {
            assert_eq!(row[1], format!("Tutor {i}"));
        }
    }

    #[test]
    fn test_every_row_matches_header_width() {
        let mut store = create_test_store();
        store.append(Collection::Tutor, tutor_row("A")).unwrap();
        store
            .append(
                Collection::School,
                codec::encode(Collection::School, &Submission::new()),
            )
            .unwrap();
        store
            .append(
                Collection::ParentStudent,
                codec::encode(Collection::ParentStudent, &Submission::new()),
            )
            .unwrap();

        for collection in Collection::ALL {
            let header_len = store.rows(collection)[0].len();
            for row in store.rows(collection) {
                assert_eq!(row.len(), header_len);
            }
        }
    }

    #[test]
    fn test_append_rejects_wrong_width() {
        let mut store = create_test_store();
        let result = store.append(Collection::Tutor, vec!["only".to_string()]);
        assert!(matches!(result, Err(Error::RowShape { got: 1, .. })));
        assert_eq!(store.rows(Collection::Tutor).len(), 1);
    }

    #[test]
    fn test_reset_leaves_header_only() {
        let mut store = create_test_store();
        store.append(Collection::Tutor, tutor_row("A")).unwrap();
        store.append(Collection::Tutor, tutor_row("B")).unwrap();

        store.reset(Collection::Tutor).unwrap();

        let rows = store.rows(Collection::Tutor);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], codec::header_row(Collection::Tutor));
    }

    #[test]
    fn test_rows_survive_reopen() {
        let db_path = std::env::temp_dir().join(format!(
            "regbook_store_test_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&db_path);

        {
            let mut store = RecordStore::open(Storage::open(&db_path).unwrap());
            store.append(Collection::Tutor, tutor_row("Persisted")).unwrap();
        }

        let store = RecordStore::open(Storage::open(&db_path).unwrap());
        assert_eq!(store.data_rows(Collection::Tutor).len(), 1);
        assert_eq!(store.data_rows(Collection::Tutor)[0][1], "Persisted");

        drop(store);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_corrupt_slot_loads_as_header_only() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .put(&Collection::School.rows_key(), b"{not json")
            .unwrap();

        let store = RecordStore::open(storage);
        let rows = store.rows(Collection::School);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], codec::header_row(Collection::School));
    }

    #[test]
    fn test_refresh_picks_up_external_writes() {
        let mut store = create_test_store();
        store.append(Collection::Tutor, tutor_row("A")).unwrap();

        // another writer replaces the slot wholesale
        let replacement = vec![codec::header_row(Collection::Tutor)];
        store
            .storage()
            .put(
                &Collection::Tutor.rows_key(),
                &serde_json::to_vec(&replacement).unwrap(),
            )
            .unwrap();

        store.refresh();
        assert_eq!(store.rows(Collection::Tutor).len(), 1);
    }

    #[test]
    fn test_stats_exclude_headers() {
        let mut store = create_test_store();
        assert_eq!(store.stats().total_rows, 0);

        store.append(Collection::Tutor, tutor_row("A")).unwrap();
        store.append(Collection::Tutor, tutor_row("B")).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_rows, 2);
        let tutor = &stats.collections[0];
        assert_eq!(tutor.collection, Collection::Tutor);
        assert_eq!(tutor.data_rows, 2);
        assert!(tutor.updated_at.is_some());
    }

    #[test]
    fn test_updated_at_absent_before_first_persist() {
        let store = create_test_store();
        assert!(store.updated_at(Collection::Tutor).is_none());
    }

    #[test]
    fn test_count_slot_tracks_data_rows() {
        let mut store = create_test_store();
        store.append(Collection::Tutor, tutor_row("A")).unwrap();
        store.append(Collection::Tutor, tutor_row("B")).unwrap();

        let count = store
            .storage()
            .get_text(&Collection::Tutor.count_key())
            .unwrap();
        assert_eq!(count, Some("2".to_string()));
    }
}
