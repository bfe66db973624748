//! Periodic snapshot mirror.
//!
//! Republishes a wholesale copy of all three collections (plus a
//! generation timestamp) into a separate storage slot on a fixed
//! interval, for polling by other local consumers. The background task
//! is controlled through an explicit handle obtained at start; ticks
//! that fail to write are logged and never retried.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::form::{Collection, Row, SNAPSHOT_KEY, SNAPSHOT_UPDATED_KEY};
use crate::store::RecordStore;

/// A point-in-time copy of all collections, written wholesale and never
/// merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When this snapshot was generated.
    pub generated_at: DateTime<Utc>,
    /// Tutor rows, header first.
    pub tutor: Vec<Row>,
    /// School rows, header first.
    pub school: Vec<Row>,
    /// Parent/student rows, header first.
    pub parent_student: Vec<Row>,
    /// Total data rows across all collections (headers excluded).
    pub total_rows: usize,
}

impl Snapshot {
    /// Gather a snapshot from the store's current in-memory collections.
    #[must_use]
    pub fn gather(store: &RecordStore) -> Self {
        let total_rows = Collection::ALL
            .into_iter()
            .map(|collection| store.data_rows(collection).len())
            .sum();
        Self {
            generated_at: Utc::now(),
            tutor: store.rows(Collection::Tutor).to_vec(),
            school: store.rows(Collection::School).to_vec(),
            parent_student: store.rows(Collection::ParentStudent).to_vec(),
            total_rows,
        }
    }
}

/// Write the current snapshot and the last-sync timestamp.
///
/// # Errors
///
/// Returns an error if serialization or a storage write fails.
pub fn write_snapshot(store: &RecordStore) -> Result<()> {
    let snapshot = Snapshot::gather(store);
    let encoded = serde_json::to_vec(&snapshot)?;
    store.storage().put(SNAPSHOT_KEY, &encoded)?;
    store
        .storage()
        .put_text(SNAPSHOT_UPDATED_KEY, &snapshot.generated_at.to_rfc3339())?;
    Ok(())
}

/// Read the last published snapshot, if any. Fails soft.
#[must_use]
pub fn read_snapshot(store: &RecordStore) -> Option<Snapshot> {
    let bytes = store.storage().get(SNAPSHOT_KEY).ok()??;
    serde_json::from_slice(&bytes).ok()
}

/// Cloneable control handle for a running mirror task.
#[derive(Debug, Clone)]
pub struct MirrorHandle {
    stop: Arc<AtomicBool>,
    wake: Arc<Notify>,
    ticks: Arc<AtomicU64>,
}

impl MirrorHandle {
    fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Signal the task to stop and wake it if it is waiting on a tick.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Number of completed snapshot ticks.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}

/// Status of the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorStatus {
    /// Whether the background task is running.
    pub running: bool,
    /// Completed snapshot ticks since the task started.
    pub ticks: u64,
    /// When a snapshot was last published.
    pub last_sync: Option<DateTime<Utc>>,
}

/// The periodic mirror. States: Stopped ⇄ Running, driven only by
/// [`enable`](Mirror::enable) and [`disable`](Mirror::disable).
#[derive(Debug)]
pub struct Mirror {
    store: Arc<Mutex<RecordStore>>,
    interval: Duration,
    running: Option<(MirrorHandle, JoinHandle<()>)>,
}

impl Mirror {
    /// Create a stopped mirror over a shared store.
    #[must_use]
    pub fn new(store: Arc<Mutex<RecordStore>>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            running: None,
        }
    }

    /// The configured tick interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the background task is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|(_, task)| !task.is_finished())
    }

    /// Start the background task. Idempotent: enabling a running mirror
    /// returns the existing handle without spawning a second timer.
    ///
    /// An immediate snapshot is written before the first full interval
    /// elapses.
    pub fn enable(&mut self) -> MirrorHandle {
        if let Some((handle, task)) = &self.running {
            if !task.is_finished() {
                debug!("Mirror already running");
                return handle.clone();
            }
        }

        let handle = MirrorHandle::new();
        let task = tokio::spawn(run_mirror(
            Arc::clone(&self.store),
            self.interval,
            handle.clone(),
        ));
        info!("Mirror enabled, interval {:?}", self.interval);
        self.running = Some((handle.clone(), task));
        handle
    }

    /// Stop the background task and wait for it to finish. No-op when
    /// already stopped.
    pub async fn disable(&mut self) {
        if let Some((handle, task)) = self.running.take() {
            handle.stop();
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!("Mirror task ended abnormally: {err}");
                }
            }
            info!("Mirror disabled");
        } else {
            debug!("Mirror already stopped");
        }
    }

    /// Current mirror status.
    #[must_use]
    pub fn status(&self) -> MirrorStatus {
        let (running, ticks) = match &self.running {
            Some((handle, task)) => (!task.is_finished(), handle.ticks()),
            None => (false, 0),
        };
        let last_sync = self
            .store
            .lock()
            .ok()
            .and_then(|store| store.storage().get_text(SNAPSHOT_UPDATED_KEY).ok().flatten())
            .and_then(|text| DateTime::parse_from_rfc3339(&text).ok())
            .map(|dt| dt.with_timezone(&Utc));

        MirrorStatus {
            running,
            ticks,
            last_sync,
        }
    }
}

async fn run_mirror(store: Arc<Mutex<RecordStore>>, period: Duration, handle: MirrorHandle) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if handle.should_stop() {
                    break;
                }
                let Ok(store) = store.lock() else {
                    warn!("Record store lock poisoned, stopping mirror");
                    break;
                };
                if let Err(err) = write_snapshot(&store) {
                    warn!("Snapshot write failed: {err}");
                }
                handle.bump();
            }
            () = handle.wake.notified() => break,
        }
    }
    debug!("Mirror task stopped");
}
