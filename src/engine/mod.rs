//! # LSM Storage Engine
//!
//! This module implements a **synchronous** LSM-tree storage engine with
//! snapshotted, copy-on-write state and a dedicated background flush
//! worker.
//!
//! ## Design Overview
//!
//! The engine organises data across three layers, queried newest-first:
//!
//! 1. **Active memtable** — an in-memory sorted map accepting writes.
//! 2. **Frozen memtables** — read-only snapshots of previously active
//!    memtables, queued oldest-first while they await flushing.
//! 3. **SSTables** — immutable, sorted, on-disk tables, one per flushed
//!    memtable, keyed by id (higher id = newer data).
//!
//! Writes land in the active memtable. When its byte size crosses
//! [`EngineConfig::memtable_threshold`] the writer freezes it onto the
//! frozen queue, installs a fresh memtable, publishes a new store
//! snapshot, and hands the flush worker a message. The worker persists the
//! oldest frozen memtable as an SSTable and publishes another snapshot
//! replacing it with the table.
//!
//! Deletes write a zero-length value (tombstone) through the same path;
//! the API maps tombstones to "absent".
//!
//! ## Concurrency Model
//!
//! The store state is an immutable value ([`StoreState`]) behind an
//! `Arc`; every committed change publishes a *new* state. Two
//! reader-writer locks coordinate publication:
//!
//! - the **snapshot lock** guards the pointer to the current state. Held
//!   briefly: shared to copy the pointer, exclusive to swap it.
//! - the **state lock** serialises structural transitions (memtable
//!   rotation, flush commits). Its exclusive holder may take the snapshot
//!   lock exclusively, never the other way around.
//!
//! Readers copy the snapshot pointer and then work entirely lock-free on
//! immutable data (the active memtable carries its own internal lock).
//!
//! ## Flush Worker
//!
//! Exactly one worker thread per engine, fed by a small bounded channel.
//! The bound applies backpressure: if flushing falls behind, the writer
//! that rotates the next memtable blocks on `send` until the worker
//! catches up, keeping the frozen queue short. `Stop` is sent once, at
//! close; channel FIFO ordering guarantees all pending flushes drain
//! first.
//!
//! ## Guarantees
//!
//! - **Snapshot isolation:** a reader sees one point-in-time state; a
//!   write is either visible in the snapshot it copied or not at all.
//! - **Recency:** active memtable ≻ newer frozen ≻ older frozen ≻ higher-id
//!   SSTable ≻ lower-id SSTable; the first layer that knows a key wins.
//! - **Id monotonicity:** memtable and SSTable ids strictly increase over
//!   the engine's lifetime; a flushed table keeps its memtable's id.
//! - **Flush fidelity:** a flushed SSTable exposes exactly the entries the
//!   frozen memtable held, tombstones included.
//! - **Close persistence:** `close()` drains the flush queue and persists
//!   the active memtable, so a reopened engine serves the last write of
//!   every key.

use std::{
    collections::{BTreeMap, VecDeque},
    fs, io,
    path::PathBuf,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam::channel::{self, Sender};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::memtable::{FrozenMemtable, Memtable, MemtableError};
use crate::sstable::{SST_EXTENSION, SSTable, SSTableError};

mod flush;
use flush::FlushMessage;

#[cfg(test)]
mod tests;

/// Capacity of the engine→worker flush channel. A full channel blocks the
/// writer that triggered the rotation, bounding the frozen queue.
const FLUSH_QUEUE_DEPTH: usize = 8;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Error originating from the memtable subsystem.
    #[error("Memtable error: {0}")]
    Memtable(#[from] MemtableError),

    /// Error originating from the SSTable subsystem.
    #[error("SSTable error: {0}")]
    SSTable(#[from] SSTableError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The engine has been closed; mutations are rejected.
    #[error("Engine is closed")]
    Closed,

    /// Internal invariant violation (poisoned lock, unexpected state, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Configuration
// ------------------------------------------------------------------------------------------------

/// Configuration for an [`Engine`] instance. Passed to [`Engine::open`].
pub struct EngineConfig {
    /// Byte size above which the active memtable is frozen and a flush is
    /// triggered.
    pub memtable_threshold: usize,

    /// Root directory for SSTable files; created if missing.
    pub directory: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// Store state — the published snapshot
// ------------------------------------------------------------------------------------------------

/// One immutable point-in-time state of the store.
///
/// Never mutated after publication: every committed change builds a new
/// `StoreState` and swaps the shared pointer. The heavyweight collections
/// hold `Arc`s, so cloning a state copies pointers, not tables.
pub(crate) struct StoreState {
    /// The one mutable memtable accepting writes.
    pub(crate) memtable: Arc<Memtable>,

    /// Frozen memtables awaiting flush, oldest at the front.
    pub(crate) frozen: VecDeque<Arc<FrozenMemtable>>,

    /// On-disk tables by id; iteration order is ascending id.
    pub(crate) sstables: BTreeMap<u64, Arc<SSTable>>,

    /// The id the next memtable will receive. Only ever advances.
    pub(crate) next_id: u64,
}

// ------------------------------------------------------------------------------------------------
// Engine core — the handle shared with the flush worker
// ------------------------------------------------------------------------------------------------

/// The fields both the engine API and the flush worker operate on.
///
/// Engine and worker each hold an `Arc<EngineCore>`; neither owns the
/// other, which breaks the engine↔worker reference cycle.
pub(crate) struct EngineCore {
    /// Immutable configuration.
    pub(crate) config: EngineConfig,

    /// Pointer to the current [`StoreState`]. Shared for pointer copies,
    /// exclusive for pointer swaps — held briefly either way.
    pub(crate) snapshot: RwLock<Arc<StoreState>>,

    /// Serialises structural transitions (rotation, flush commit). Taken
    /// shared by the `put` fast path, exclusive by rotation and flush.
    pub(crate) state_lock: RwLock<()>,
}

impl EngineCore {
    /// Copies the current snapshot pointer under the shared snapshot lock.
    pub(crate) fn current(&self) -> Result<Arc<StoreState>, EngineError> {
        let guard = self
            .snapshot
            .read()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
        Ok(Arc::clone(&guard))
    }
}

// ------------------------------------------------------------------------------------------------
// Engine — public API
// ------------------------------------------------------------------------------------------------

/// The main LSM storage engine handle.
///
/// Reads and writes may be issued from any number of threads; a single
/// background worker flushes frozen memtables to disk.
pub struct Engine {
    /// State shared with the flush worker.
    core: Arc<EngineCore>,

    /// Sole sender of flush messages.
    flush_tx: Sender<FlushMessage>,

    /// Worker join handle, taken by the first `close()`.
    worker: Mutex<Option<thread::JoinHandle<()>>>,

    /// Set by `close()`; mutations are rejected afterwards.
    closed: AtomicBool,
}

impl Engine {
    /// Opens (or creates) an engine rooted at the configured directory.
    ///
    /// On an existing directory every `.sst` file is opened and indexed by
    /// the id its footer carries, and the id counter resumes past the
    /// highest one found. On a fresh directory the engine starts empty.
    /// The flush worker is spawned before this returns.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let mut sstables = BTreeMap::new();

        if config.directory.is_dir() {
            for entry in fs::read_dir(&config.directory)? {
                let path = entry?.path();
                if path.is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some(SST_EXTENSION)
                {
                    let sstable = SSTable::open(&path)?;
                    debug!(id = sstable.id(), path = %path.display(), "sstable discovered");
                    sstables.insert(sstable.id(), Arc::new(sstable));
                }
            }
        } else {
            fs::create_dir_all(&config.directory)?;
        }

        // The footer id is authoritative, so the counter resumes from the
        // highest id on disk regardless of filenames.
        let memtable_id = sstables.keys().next_back().map_or(0, |id| id + 1);

        info!(
            directory = %config.directory.display(),
            sstables = sstables.len(),
            memtable_id,
            "store opened"
        );

        let state = StoreState {
            memtable: Arc::new(Memtable::new(memtable_id)),
            frozen: VecDeque::new(),
            sstables,
            next_id: memtable_id + 1,
        };

        let core = Arc::new(EngineCore {
            config,
            snapshot: RwLock::new(Arc::new(state)),
            state_lock: RwLock::new(()),
        });

        let (flush_tx, flush_rx) = channel::bounded(FLUSH_QUEUE_DEPTH);
        let worker_core = Arc::clone(&core);
        let worker = thread::Builder::new()
            .name("stratadb-flush".into())
            .spawn(move || flush::run(worker_core, flush_rx))?;

        Ok(Self {
            core,
            flush_tx,
            worker: Mutex::new(Some(worker)),
            closed: AtomicBool::new(false),
        })
    }

    /// Look up a single key.
    ///
    /// Returns `Ok(Some(value))` if the key exists, `Ok(None)` if it was
    /// never written or was removed, or `Err` on I/O failure.
    ///
    /// The lookup copies one snapshot and consults its layers newest-first:
    /// active memtable → frozen memtables (newest → oldest) → SSTables
    /// (descending id). The first layer that knows the key is
    /// authoritative; a zero-length value means "removed".
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        let snapshot = self.core.current()?;

        if let Some(value) = snapshot.memtable.get(key)? {
            return Ok(visible(value));
        }

        for frozen in snapshot.frozen.iter().rev() {
            if let Some(value) = frozen.get(key) {
                return Ok(visible(value.to_vec()));
            }
        }

        for sstable in snapshot.sstables.values().rev() {
            if let Some(value) = sstable.get(key)? {
                return Ok(visible(value));
            }
        }

        Ok(None)
    }

    /// Insert or update a key-value pair.
    ///
    /// The fast path writes through the current snapshot's memtable under
    /// shared locks only. When the write pushes the memtable past the
    /// configured threshold, the slow path re-checks under the exclusive
    /// state lock (so exactly one writer rotates), freezes the memtable
    /// onto the frozen queue, publishes a fresh snapshot, and notifies the
    /// flush worker.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }

        // Fast path: shared locks only. The memtable's own lock serialises
        // concurrent writers.
        let size = {
            let _structural = self
                .core
                .state_lock
                .read()
                .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
            let snapshot = self.core.current()?;
            snapshot.memtable.put(key, value)?;
            snapshot.memtable.size_bytes()?
        };

        if size <= self.core.config.memtable_threshold {
            return Ok(());
        }

        // Slow path: the threshold may have been crossed. The exclusive
        // state lock serialises the re-check so at most one writer rotates.
        let _structural = self
            .core
            .state_lock
            .write()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

        let snapshot = self.core.current()?;
        if snapshot.memtable.size_bytes()? <= self.core.config.memtable_threshold {
            // Another writer already rotated this memtable.
            return Ok(());
        }

        let frozen = Arc::new(snapshot.memtable.freeze()?);
        let fresh_id = snapshot.next_id;

        debug!(
            frozen_id = frozen.id(),
            frozen_bytes = frozen.size_bytes(),
            fresh_id,
            "memtable rotated"
        );

        {
            let mut guard = self
                .core
                .snapshot
                .write()
                .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
            let mut frozen_queue = snapshot.frozen.clone();
            frozen_queue.push_back(frozen);
            *guard = Arc::new(StoreState {
                memtable: Arc::new(Memtable::new(fresh_id)),
                frozen: frozen_queue,
                sstables: snapshot.sstables.clone(),
                next_id: fresh_id + 1,
            });
        }

        // May block when the worker lags — that backpressure is what keeps
        // the frozen queue bounded.
        self.flush_tx
            .send(FlushMessage::Flush)
            .map_err(|_| EngineError::Internal("flush channel disconnected".into()))?;

        Ok(())
    }

    /// Delete a key by writing a zero-length tombstone.
    ///
    /// Equivalent to `put(key, b"")`; the tombstone shadows older values in
    /// every layer and persists through flushes.
    pub fn remove(&self, key: &[u8]) -> Result<(), EngineError> {
        self.put(key, b"")
    }

    /// Gracefully shuts down the engine. Idempotent.
    ///
    /// Stops the flush worker (after it drains all queued flushes), then
    /// persists any remaining frozen memtables and the active memtable so
    /// that a reopened engine serves every acknowledged write.
    pub fn close(&self) -> Result<(), EngineError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        // FIFO channel: the worker sees Stop only after every queued Flush.
        if self.flush_tx.send(FlushMessage::Stop).is_err() {
            warn!("flush channel already disconnected at close");
        }

        let handle = {
            let mut guard = self
                .worker
                .lock()
                .map_err(|_| EngineError::Internal("Mutex poisoned".into()))?;
            guard.take()
        };
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| EngineError::Internal("flush worker panicked".into()))?;
        }

        // Rotate the active memtable onto the queue if it holds data.
        {
            let _structural = self
                .core
                .state_lock
                .write()
                .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
            let snapshot = self.core.current()?;
            if !snapshot.memtable.is_empty()? {
                let frozen = Arc::new(snapshot.memtable.freeze()?);
                let fresh_id = snapshot.next_id;
                let mut guard = self
                    .core
                    .snapshot
                    .write()
                    .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
                let mut frozen_queue = snapshot.frozen.clone();
                frozen_queue.push_back(frozen);
                *guard = Arc::new(StoreState {
                    memtable: Arc::new(Memtable::new(fresh_id)),
                    frozen: frozen_queue,
                    sstables: snapshot.sstables.clone(),
                    next_id: fresh_id + 1,
                });
            }
        }

        // Persist whatever is still queued (including worker leftovers
        // after persistent flush failures).
        while flush::flush_oldest_frozen(&self.core)? {}

        info!("store closed");
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            error!(%error, "close failed during drop");
        }
    }
}

/// Maps a stored value to its API-visible form: zero-length values are
/// tombstones and read as "absent".
fn visible(value: Vec<u8>) -> Option<Vec<u8>> {
    if value.is_empty() { None } else { Some(value) }
}
