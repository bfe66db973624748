//! Application context: explicit construction and wiring of every
//! component, in place of ambient globals or singletons.

use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::Result;
use crate::export::{self, Exporter};
use crate::mirror::Mirror;
use crate::storage::Storage;
use crate::store::RecordStore;

/// Owns the configured components for one process run.
///
/// The store is shared behind a mutex only because the mirror task
/// reads it from another task; everything else borrows through the
/// context.
#[derive(Debug)]
pub struct AppContext {
    /// The loaded configuration.
    pub config: Config,
    /// The record store, shared with the mirror task.
    pub store: Arc<Mutex<RecordStore>>,
    /// The exporter, with its workbook capability resolved at startup.
    pub exporter: Exporter,
    /// The periodic mirror (initially stopped).
    pub mirror: Mirror,
}

impl AppContext {
    /// Build a context from configuration: open storage, load the
    /// collections, resolve the workbook capability once, and prepare
    /// a stopped mirror.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger database cannot be opened.
    pub fn init(config: Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        Self::with_storage(config, storage)
    }

    /// Build a context over an in-memory database. For tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn init_in_memory(config: Config) -> Result<Self> {
        let storage = Storage::open_in_memory()?;
        Self::with_storage(config, storage)
    }

    fn with_storage(config: Config, storage: Storage) -> Result<Self> {
        let store = Arc::new(Mutex::new(RecordStore::open(storage)));
        let exporter = Exporter::new(export::workbook_writer(), config.export_dir());
        let mirror = Mirror::new(Arc::clone(&store), config.mirror_interval());

        Ok(Self {
            config,
            store,
            exporter,
            mirror,
        })
    }
}
