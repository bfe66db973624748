//! Spreadsheet export.
//!
//! Workbook rendering is an injected optional capability, resolved once
//! at startup: when the `xlsx` feature is compiled in, exports produce
//! `.xlsx` workbooks via `rust_xlsxwriter`; otherwise they degrade to
//! per-collection CSV files with a date suffix. Rendered workbook bytes
//! can also be cached into storage for later retrieval.

pub mod csv;

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::form::{Collection, Row, COMBINED_WORKBOOK_FILE, WORKBOOK_ALL_KEY};
use crate::store::RecordStore;

/// Sheet name used for single-collection workbooks.
const SINGLE_SHEET_NAME: &str = "Registrations";

/// One sheet of a workbook to render.
#[derive(Debug)]
pub struct Sheet<'a> {
    /// Sheet (tab) name.
    pub name: &'a str,
    /// All rows, header first.
    pub rows: &'a [Row],
}

/// Capability for rendering row sequences into a workbook binary.
pub trait WorkbookWriter: Send + Sync {
    /// Render the given sheets into workbook bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&self, sheets: &[Sheet<'_>]) -> Result<Vec<u8>>;
}

#[cfg(feature = "xlsx")]
mod xlsx {
    use rust_xlsxwriter::Workbook;

    use super::{Sheet, WorkbookWriter};
    use crate::error::{Error, Result};

    /// Workbook rendering backed by `rust_xlsxwriter`.
    #[derive(Debug, Default)]
    pub struct XlsxWriter;

    impl WorkbookWriter for XlsxWriter {
        fn render(&self, sheets: &[Sheet<'_>]) -> Result<Vec<u8>> {
            let mut workbook = Workbook::new();
            for sheet in sheets {
                let worksheet = workbook.add_worksheet();
                worksheet
                    .set_name(sheet.name)
                    .map_err(|err| Error::workbook(err.to_string()))?;
                for (r, row) in sheet.rows.iter().enumerate() {
                    let r = u32::try_from(r)
                        .map_err(|_| Error::workbook("sheet has too many rows"))?;
                    for (c, cell) in row.iter().enumerate() {
                        let c = u16::try_from(c)
                            .map_err(|_| Error::workbook("row has too many columns"))?;
                        worksheet
                            .write_string(r, c, cell.as_str())
                            .map_err(|err| Error::workbook(err.to_string()))?;
                    }
                }
            }
            workbook
                .save_to_buffer()
                .map_err(|err| Error::workbook(err.to_string()))
        }
    }
}

#[cfg(feature = "xlsx")]
pub use xlsx::XlsxWriter;

/// Resolve the workbook capability once at startup.
///
/// Returns `None` when the crate was built without the `xlsx` feature;
/// callers then take the CSV fallback path.
#[must_use]
pub fn workbook_writer() -> Option<Arc<dyn WorkbookWriter>> {
    #[cfg(feature = "xlsx")]
    {
        Some(Arc::new(XlsxWriter))
    }
    #[cfg(not(feature = "xlsx"))]
    {
        None
    }
}

/// On-demand exporter for the registration collections.
pub struct Exporter {
    writer: Option<Arc<dyn WorkbookWriter>>,
    out_dir: PathBuf,
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("workbook_support", &self.writer.is_some())
            .field("out_dir", &self.out_dir)
            .finish()
    }
}

impl Exporter {
    /// Create an exporter writing into `out_dir`.
    #[must_use]
    pub fn new(writer: Option<Arc<dyn WorkbookWriter>>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            out_dir: out_dir.into(),
        }
    }

    /// Whether workbook rendering is available.
    #[must_use]
    pub fn has_workbook_support(&self) -> bool {
        self.writer.is_some()
    }

    /// A copy of this exporter writing into a different directory,
    /// sharing the same workbook capability.
    #[must_use]
    pub fn with_out_dir(&self, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: self.writer.clone(),
            out_dir: out_dir.into(),
        }
    }

    /// Export one collection to a file, re-loading from storage first.
    ///
    /// Produces `<Stem>.xlsx` when workbook rendering is available,
    /// `<Stem>_<date>.csv` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing the file fails.
    pub fn export_collection(
        &self,
        store: &mut RecordStore,
        collection: Collection,
    ) -> Result<PathBuf> {
        store.refresh();
        if let Some(writer) = &self.writer {
            let sheets = [Sheet {
                name: SINGLE_SHEET_NAME,
                rows: store.rows(collection),
            }];
            let bytes = writer.render(&sheets)?;
            let path = self
                .out_dir
                .join(format!("{}.xlsx", collection.file_stem()));
            self.write_file(&path, &bytes)?;
            info!("Exported {collection} to {}", path.display());
            Ok(path)
        } else {
            warn!("Workbook rendering unavailable, writing CSV for {collection}");
            self.write_csv(store, collection)
        }
    }

    /// Export all collections, re-loading from storage first.
    ///
    /// With workbook rendering available this produces one combined
    /// workbook with a sheet per non-empty collection; otherwise one
    /// CSV file per collection. Returns the written paths.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing a file fails.
    pub fn export_all(&self, store: &mut RecordStore) -> Result<Vec<PathBuf>> {
        store.refresh();
        if let Some(writer) = &self.writer {
            let sheets: Vec<Sheet<'_>> = Collection::ALL
                .into_iter()
                .filter(|collection| !store.rows(*collection).is_empty())
                .map(|collection| Sheet {
                    name: collection.sheet_name(),
                    rows: store.rows(collection),
                })
                .collect();
            let bytes = writer.render(&sheets)?;
            let path = self.out_dir.join(COMBINED_WORKBOOK_FILE);
            self.write_file(&path, &bytes)?;
            info!("Exported combined workbook to {}", path.display());
            Ok(vec![path])
        } else {
            warn!("Workbook rendering unavailable, writing one CSV per collection");
            Collection::ALL
                .into_iter()
                .map(|collection| self.write_csv(store, collection))
                .collect()
        }
    }

    /// Render every collection plus the combined workbook and cache the
    /// bytes into storage under the derived workbook keys.
    ///
    /// Returns `false` (logged, not an error) when workbook rendering
    /// is unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or a storage write fails.
    pub fn cache_workbooks(&self, store: &mut RecordStore) -> Result<bool> {
        let Some(writer) = &self.writer else {
            info!("Workbook rendering unavailable, skipping workbook cache");
            return Ok(false);
        };

        store.refresh();
        for collection in Collection::ALL {
            let sheets = [Sheet {
                name: SINGLE_SHEET_NAME,
                rows: store.rows(collection),
            }];
            let bytes = writer.render(&sheets)?;
            store.storage().put(&collection.workbook_key(), &bytes)?;
        }

        let sheets: Vec<Sheet<'_>> = Collection::ALL
            .into_iter()
            .filter(|collection| !store.rows(*collection).is_empty())
            .map(|collection| Sheet {
                name: collection.sheet_name(),
                rows: store.rows(collection),
            })
            .collect();
        let bytes = writer.render(&sheets)?;
        store.storage().put(WORKBOOK_ALL_KEY, &bytes)?;

        info!("Cached workbooks for all collections");
        Ok(true)
    }

    fn write_csv(&self, store: &RecordStore, collection: Collection) -> Result<PathBuf> {
        let date = Local::now().format("%Y-%m-%d");
        let path = self
            .out_dir
            .join(format!("{}_{date}.csv", collection.file_stem()));
        self.ensure_out_dir()?;

        let file = fs::File::create(&path).map_err(|source| Error::ExportWrite {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        csv::write_rows(&mut writer, store.rows(collection)).map_err(|source| {
            Error::ExportWrite {
                path: path.clone(),
                source,
            }
        })?;

        info!("Exported {collection} to {}", path.display());
        Ok(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_out_dir()?;
        fs::write(path, bytes).map_err(|source| Error::ExportWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    fn ensure_out_dir(&self) -> Result<()> {
        if !self.out_dir.exists() {
            fs::create_dir_all(&self.out_dir).map_err(|source| Error::DirectoryCreate {
                path: self.out_dir.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::form::Submission;
    use crate::storage::Storage;

    fn create_test_store() -> RecordStore {
        let mut store = RecordStore::open(Storage::open_in_memory().unwrap());
        let submission = Submission::new()
            .text("fullName", "A. Sharma")
            .list("subjects", ["Math", "English"]);
        store
            .append(Collection::Tutor, codec::encode(Collection::Tutor, &submission))
            .unwrap();
        store
    }

    fn temp_out_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "regbook_export_{label}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_csv_fallback_names_have_date_suffix() {
        let out_dir = temp_out_dir("fallback");
        let exporter = Exporter::new(None, out_dir.clone());
        let mut store = create_test_store();

        let path = exporter
            .export_collection(&mut store, Collection::Tutor)
            .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Tutor_Registrations_"));
        assert!(name.ends_with(".csv"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Timestamp,Full Name,"));
        // the joined multi-select cell is quoted
        assert!(content.contains("\"Math, English\""));

        let _ = fs::remove_dir_all(&out_dir);
    }

    #[test]
    fn test_export_all_fallback_writes_three_files() {
        let out_dir = temp_out_dir("fallback_all");
        let exporter = Exporter::new(None, out_dir.clone());
        let mut store = create_test_store();

        let paths = exporter.export_all(&mut store).unwrap();
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert!(path.exists());
        }

        let _ = fs::remove_dir_all(&out_dir);
    }

    #[test]
    fn test_cache_without_support_is_skipped() {
        let exporter = Exporter::new(None, temp_out_dir("nocache"));
        let mut store = create_test_store();

        assert!(!exporter.cache_workbooks(&mut store).unwrap());
        assert!(store
            .storage()
            .get(&Collection::Tutor.workbook_key())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_export_serializes_fresh_rows() {
        let out_dir = temp_out_dir("fresh");
        let exporter = Exporter::new(None, out_dir.clone());
        let mut store = create_test_store();

        // a second writer appends behind the in-memory copy's back
        let mut rows: Vec<Row> = store.rows(Collection::Tutor).to_vec();
        rows.push(codec::encode(
            Collection::Tutor,
            &Submission::new().text("fullName", "B. Verma"),
        ));
        store
            .storage()
            .put(
                &Collection::Tutor.rows_key(),
                &serde_json::to_vec(&rows).unwrap(),
            )
            .unwrap();

        let path = exporter
            .export_collection(&mut store, Collection::Tutor)
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("B. Verma"));

        let _ = fs::remove_dir_all(&out_dir);
    }

    #[cfg(feature = "xlsx")]
    mod xlsx_tests {
        use super::*;

        #[test]
        fn test_workbook_writer_is_resolved() {
            assert!(workbook_writer().is_some());
        }

        #[test]
        fn test_render_produces_nonempty_workbook() {
            let store = create_test_store();
            let writer = XlsxWriter;
            let sheets = [Sheet {
                name: SINGLE_SHEET_NAME,
                rows: store.rows(Collection::Tutor),
            }];
            let bytes = writer.render(&sheets).unwrap();
            assert!(!bytes.is_empty());
            // XLSX files are ZIP containers
            assert!(bytes.starts_with(b"PK"));
        }

        #[test]
        fn test_export_collection_writes_xlsx() {
            let out_dir = temp_out_dir("xlsx");
            let exporter = Exporter::new(workbook_writer(), out_dir.clone());
            let mut store = create_test_store();

            let path = exporter
                .export_collection(&mut store, Collection::Tutor)
                .unwrap();
            assert_eq!(
                path.file_name().unwrap().to_string_lossy(),
                "Tutor_Registrations.xlsx"
            );
            assert!(path.exists());

            let _ = fs::remove_dir_all(&out_dir);
        }

        #[test]
        fn test_export_all_writes_combined_workbook() {
            let out_dir = temp_out_dir("xlsx_all");
            let exporter = Exporter::new(workbook_writer(), out_dir.clone());
            let mut store = create_test_store();

            let paths = exporter.export_all(&mut store).unwrap();
            assert_eq!(paths.len(), 1);
            assert_eq!(
                paths[0].file_name().unwrap().to_string_lossy(),
                COMBINED_WORKBOOK_FILE
            );

            let _ = fs::remove_dir_all(&out_dir);
        }

        #[test]
        fn test_cache_workbooks_stores_bytes() {
            let exporter = Exporter::new(workbook_writer(), temp_out_dir("cache"));
            let mut store = create_test_store();

            assert!(exporter.cache_workbooks(&mut store).unwrap());
            for collection in Collection::ALL {
                let bytes = store
                    .storage()
                    .get(&collection.workbook_key())
                    .unwrap()
                    .expect("cached workbook missing");
                assert!(!bytes.is_empty());
            }
            assert!(store.storage().get(WORKBOOK_ALL_KEY).unwrap().is_some());
        }
    }
}
