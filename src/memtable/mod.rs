//! # Memtable Module
//!
//! ## Design Invariants
//!
//! - The memtable is an **ordered** key→value map; iteration yields keys
//!   in ascending byte order, which is what SSTable construction relies on.
//! - Each memtable carries a stable identifier assigned by the engine at
//!   creation. Freezing preserves it; the SSTable flushed from a frozen
//!   memtable inherits it.
//! - `size_bytes` tracks the sum of key and value lengths of the entries
//!   currently in the map. Overwrites adjust it by the value-length delta.
//! - Deletes are represented as zero-length values (tombstones), written
//!   through the same `put` path as any other value. The memtable itself
//!   makes no distinction; tombstone interpretation belongs to the engine.
//!
//! ## Freeze Semantics
//!
//! - `freeze` takes a consistent snapshot of the map and size under the
//!   shared lock and returns it as a read-only [`FrozenMemtable`] with the
//!   same id.
//! - Freezing does **not** mutate the mutable memtable; the engine retires
//!   it by publishing a snapshot that no longer references it.
//!
//! ## Concurrency
//!
//! - Writers acquire an exclusive lock; readers may proceed concurrently.
//! - A [`FrozenMemtable`] is immutable by construction and needs no lock.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::{collections::BTreeMap, sync::RwLock};

use thiserror::Error;
use tracing::{error, trace};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Represents possible errors returned by [`Memtable`] operations.
#[derive(Debug, Error)]
pub enum MemtableError {
    /// Internal invariant violation or poisoned lock.
    #[error("Internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Memtable Core
// ------------------------------------------------------------------------------------------------

/// The mutable, in-memory write buffer of the storage engine.
///
/// The memtable:
/// - Accepts writes (`put`)
/// - Serves reads (`get`)
/// - Reports its byte footprint (`size_bytes`) so the engine can decide
///   when to freeze it
/// - Can be snapshotted into a read-only [`FrozenMemtable`] (`freeze`)
///
/// # Concurrency
/// - Writers acquire an exclusive lock
/// - Readers may proceed concurrently
pub struct Memtable {
    /// Identifier assigned by the engine; never changes.
    id: u64,

    /// Thread-safe container for the map and its size accounting.
    inner: RwLock<MemtableInner>,
}

/// Internal shared state of the memtable.
///
/// Protected by an `RwLock` and never accessed directly outside the
/// memtable implementation.
struct MemtableInner {
    /// Entries in ascending key order.
    entries: BTreeMap<Vec<u8>, Vec<u8>>,

    /// Sum of key and value lengths of the current entries.
    size_bytes: usize,
}

impl Memtable {
    /// Creates a new, empty mutable [`Memtable`] with the given id.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            inner: RwLock::new(MemtableInner {
                entries: BTreeMap::new(),
                size_bytes: 0,
            }),
        }
    }

    /// Returns this memtable's identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Retrieves the current value for a key.
    ///
    /// A zero-length value (tombstone) is returned as-is; the engine maps
    /// it to "absent" at the API boundary.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, MemtableError> {
        let guard = self.inner.read().map_err(|_| {
            error!("read-write lock poisoned during get");
            MemtableError::Internal("RwLock poisoned".into())
        })?;

        Ok(guard.entries.get(key).cloned())
    }

    /// Inserts or updates a key with a new value.
    ///
    /// # Size accounting
    /// - New key: the accumulator grows by `key.len() + value.len()`.
    /// - Overwrite: the accumulator is adjusted by the value-length delta,
    ///   so it always equals the sum of the lengths of the live entries.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), MemtableError> {
        trace!("put() started, key: {}", HexKey(key));

        let mut guard = self.inner.write().map_err(|_| {
            error!("read-write lock poisoned during put");
            MemtableError::Internal("RwLock poisoned".into())
        })?;

        match guard.entries.insert(key.to_vec(), value.to_vec()) {
            Some(old_value) => {
                guard.size_bytes = guard.size_bytes - old_value.len() + value.len();
            }
            None => {
                guard.size_bytes += key.len() + value.len();
            }
        }

        Ok(())
    }

    /// Returns the current byte-size accumulator.
    pub fn size_bytes(&self) -> Result<usize, MemtableError> {
        let guard = self.inner.read().map_err(|_| {
            error!("read-write lock poisoned during size_bytes");
            MemtableError::Internal("RwLock poisoned".into())
        })?;

        Ok(guard.size_bytes)
    }

    /// Returns `true` if the memtable holds no entries.
    pub fn is_empty(&self) -> Result<bool, MemtableError> {
        let guard = self.inner.read().map_err(|_| {
            error!("read-write lock poisoned during is_empty");
            MemtableError::Internal("RwLock poisoned".into())
        })?;

        Ok(guard.entries.is_empty())
    }

    /// Takes a consistent snapshot of this memtable as a read-only
    /// [`FrozenMemtable`] carrying the same id.
    ///
    /// Runs under the shared lock: concurrent readers proceed, writers are
    /// excluded for the duration of the clone.
    pub fn freeze(&self) -> Result<FrozenMemtable, MemtableError> {
        let guard = self.inner.read().map_err(|_| {
            error!("read-write lock poisoned during freeze");
            MemtableError::Internal("RwLock poisoned".into())
        })?;

        trace!(
            id = self.id,
            entries = guard.entries.len(),
            size_bytes = guard.size_bytes,
            "memtable frozen"
        );

        Ok(FrozenMemtable {
            id: self.id,
            entries: guard.entries.clone(),
            size_bytes: guard.size_bytes,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// Frozen Memtable
// ------------------------------------------------------------------------------------------------

/// An immutable, read-only snapshot of a memtable.
///
/// A frozen memtable:
/// - Exposes only read APIs
/// - Needs no locking (immutable by construction)
/// - Keeps its producer's id, which becomes the id of the SSTable it is
///   flushed into
pub struct FrozenMemtable {
    id: u64,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    size_bytes: usize,
}

impl FrozenMemtable {
    /// Returns this memtable's identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Retrieves the value for a key, tombstones included.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Iterates entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of key and value lengths at freeze time.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

// ------------------------------------------------------------------------------------------------
// Tracing Helper
// ------------------------------------------------------------------------------------------------

pub(crate) struct HexKey<'a>(pub(crate) &'a [u8]);

impl<'a> std::fmt::Display for HexKey<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.len() <= 32 {
            for byte in self.0 {
                write!(f, "{:02x}", byte)?;
            }
        } else {
            for byte in &self.0[..16] {
                write!(f, "{:02x}", byte)?;
            }
            write!(f, "...[{} bytes]", self.0.len())?;
        }
        Ok(())
    }
}
