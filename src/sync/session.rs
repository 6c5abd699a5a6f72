//! Host-side glue that runs engine operations in the background.
//!
//! The session owns the note store and engine behind mutexes and routes
//! every operation through a [`Dispatcher`]:
//!
//! - startup work (`resume`, first `finish_sync`) runs one at a time on
//!   the `sync` key
//! - write-back passes run one at a time on the `write` key and are never
//!   dropped
//! - the periodic loop never has two instances
//!
//! Write-back workers only receive [`NoteFile`]s built on the caller's
//! thread, so they never hold the store lock while touching disk.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::dispatch::{DispatchOptions, Dispatched, Dispatcher};
use crate::storage::{NoteStore, Snapshot};
use crate::sync::engine::SyncEngine;
use crate::sync::types::{NoteFile, StateCell, SyncError, SyncOutcome, SyncResult, SyncState};

const SYNC_KEY: &str = "sync";
const WRITE_KEY: &str = "write";
const PERIODIC_KEY: &str = "periodic";

/// Poll step for the periodic loop, so shutdown is noticed promptly.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Background sync session.
pub struct SyncSession<S> {
    config: SyncConfig,
    store: Arc<Mutex<S>>,
    engine: Arc<Mutex<SyncEngine>>,
    state: StateCell,
    sync_tasks: Dispatcher<&'static str>,
    write_tasks: Dispatcher<&'static str>,
    periodic: Dispatcher<&'static str>,
}

impl<S: NoteStore + Send + 'static> SyncSession<S> {
    #[must_use]
    pub fn new(config: SyncConfig, store: S) -> Self {
        let engine = SyncEngine::new(config.clone());
        let state = engine.state_cell();
        Self {
            config,
            store: Arc::new(Mutex::new(store)),
            engine: Arc::new(Mutex::new(engine)),
            state,
            sync_tasks: Dispatcher::new("notesync-sync", DispatchOptions::exclusive()),
            write_tasks: Dispatcher::new("notesync-write", DispatchOptions::exclusive()),
            periodic: Dispatcher::new("notesync-periodic", DispatchOptions::bounded(0)),
        }
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state.get()
    }

    /// Shared handle to the note store.
    #[must_use]
    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Begin startup in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned. Engine
    /// errors are returned through the join handle.
    pub fn resume(&self, cached: Option<Snapshot>) -> std::io::Result<Dispatched<(), SyncError>> {
        let store = Arc::clone(&self.store);
        let engine = Arc::clone(&self.engine);
        self.sync_tasks.spawn(SYNC_KEY, move || {
            let mut engine = lock(&engine);
            let mut store = lock(&store);
            engine.start(&mut *store, cached.as_ref())
        })
    }

    /// Push the result of a remote sync to disk.
    ///
    /// During startup this runs the full reconciliation. Once running, the
    /// notes named in `updated` are serialized here and written back in
    /// the background.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidState` if the session is neither
    /// starting up nor running, or `SyncError::Io` if the worker thread
    /// cannot be spawned.
    pub fn finish_sync(
        &self,
        updated: HashSet<String>,
    ) -> SyncResult<Dispatched<SyncOutcome, SyncError>> {
        match self.state.get() {
            SyncState::InitialSync => {
                let store = Arc::clone(&self.store);
                let engine = Arc::clone(&self.engine);
                Ok(self.sync_tasks.spawn(SYNC_KEY, move || {
                    let mut engine = lock(&engine);
                    let mut store = lock(&store);
                    engine.finish_startup(&mut *store, &updated)
                })?)
            }
            SyncState::Running => {
                let files = self.snapshot_files(&updated);
                debug!(count = files.len(), "Dispatching write-back");
                let engine = Arc::clone(&self.engine);
                Ok(self
                    .write_tasks
                    .spawn(WRITE_KEY, move || lock(&engine).write_files(&files))?)
            }
            state => Err(SyncError::InvalidState {
                operation: "finish sync",
                state,
            }),
        }
    }

    fn snapshot_files(&self, ids: &HashSet<String>) -> Vec<NoteFile> {
        let store = lock(&self.store);
        let mut ids: Vec<&String> = ids.iter().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| store.get(id))
            .map(|note| NoteFile::from_note(&self.config, &*store, note))
            .collect()
    }

    /// Call `tick` every `interval` until the session shuts down.
    ///
    /// A second call while the loop is alive is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn spawn_periodic<F>(
        &self,
        interval: Duration,
        tick: F,
    ) -> std::io::Result<Dispatched<(), SyncError>>
    where
        F: Fn() + Send + 'static,
    {
        let state = self.state.clone();
        self.periodic.spawn(PERIODIC_KEY, move || {
            info!(interval_ms = interval.as_millis(), "Periodic sync started");
            loop {
                let mut waited = Duration::ZERO;
                while waited < interval {
                    if state.get() == SyncState::ShuttingDown {
                        info!("Periodic sync stopped");
                        return Ok(());
                    }
                    let step = SHUTDOWN_POLL.min(interval - waited);
                    thread::sleep(step);
                    waited += step;
                }
                if state.get() == SyncState::ShuttingDown {
                    info!("Periodic sync stopped");
                    return Ok(());
                }
                tick();
            }
        })
    }

    /// Drop back to `Uninitialized` and clear the store.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidState` unless running.
    pub fn logout(&self) -> SyncResult<()> {
        lock(&self.engine).logout()?;
        lock(&self.store).restore(&Snapshot::default());
        Ok(())
    }

    /// Signal background loops to stop.
    pub fn shutdown(&self) {
        self.state.set(SyncState::ShuttingDown);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
