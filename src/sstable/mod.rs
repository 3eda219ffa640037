//! Sorted String Table (SSTable) Module
//!
//! This module implements an **immutable**, **disk-backed** sorted string
//! table: the persistent form of a flushed memtable. Each SSTable holds
//! every entry of the memtable it was flushed from, in key order, plus the
//! metadata needed to answer a point lookup without scanning the whole
//! file.
//!
//! # On-disk layout
//!
//! ```text
//! [ payload: k0 v0 k1 v1 … kN-1 vN-1 ]       raw bytes, no framing
//! [ offsets region ]                          (key_offset, value_offset) per record
//! [ sparse-index region ]                     [key_len][key][record_index] entries
//! [ footer: index_start, offsets_start, id ]  three u64s, last 24 bytes
//! ```
//!
//! All integers are little-endian unsigned 64-bit, encoded via
//! [`crate::encoding`]. Keys and values carry no framing of their own; the
//! offsets region is the sole source of record boundaries.
//!
//! - **Payload** — keys and values back to back, in key order.
//! - **Offsets region** — packed [`offsets::OffsetPair`] array giving the
//!   payload framing.
//! - **Sparse-index region** — sampled keys mapping to record indices,
//!   bounding each lookup to roughly one stride of payload.
//! - **Footer** — locates the two regions and records the table id; read
//!   first, from the file tail.
//!
//! # Sub-modules
//!
//! - [`file`] — atomic file creation and memory-mapped positioned reads.
//! - [`offsets`] — the packed offsets array.
//! - [`index`] — the sparse key index.
//!
//! # Concurrency model
//!
//! - SSTables are **immutable**, so reads are lock-free and thread-safe.
//! - Multiple readers can safely access the same SSTable concurrently.
//! - Updates never happen in place; newer data lives in newer tables.
//!
//! # Guarantees
//!
//! - **Immutability:** once written, an SSTable is never modified.
//! - **Atomic creation:** files are materialized via a temporary path and
//!   rename-on-success; a crash cannot leave a partial table.
//! - **Value fidelity:** the value returned for a key is byte-identical to
//!   the value the source memtable held at freeze time, zero-length
//!   tombstones included.

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub(crate) mod file;
pub(crate) mod index;
pub(crate) mod offsets;

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::info;

use crate::encoding::{Decode, Encode, EncodingError, U64_SIZE};
use crate::memtable::FrozenMemtable;

use file::TableFile;
use index::SparseIndex;
use offsets::Offsets;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Footer size: three little-endian `u64`s, always the last bytes of the file.
pub(crate) const SST_FOOTER_SIZE: usize = 3 * U64_SIZE;

/// File extension used for table files (`sstable-<id>.sst`).
pub(crate) const SST_EXTENSION: &str = "sst";

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by SSTable operations (read, write, build).
#[derive(Debug, Error)]
pub enum SSTableError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding / decoding error.
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The file does not match the expected on-disk layout.
    #[error("Malformed SSTable: {0}")]
    Format(String),

    /// A positioned read extended past the end of the file.
    #[error("short read: offset {offset} + len {len} exceeds file size {file_size}")]
    ShortRead {
        /// Requested start offset.
        offset: usize,
        /// Requested length.
        len: usize,
        /// Actual file size.
        file_size: usize,
    },

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Footer
// ------------------------------------------------------------------------------------------------

/// Fixed-size trailer locating the offsets and sparse-index regions.
///
/// The id stored here is authoritative; the `sstable-<id>.sst` filename is
/// advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Footer {
    /// Byte offset of the sparse-index region.
    pub(crate) index_start: u64,

    /// Byte offset of the offsets region (== end of the payload).
    pub(crate) offsets_start: u64,

    /// Identifier of this table (inherited from the flushed memtable).
    pub(crate) id: u64,
}

impl Encode for Footer {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.index_start.encode_to(buf)?;
        self.offsets_start.encode_to(buf)?;
        self.id.encode_to(buf)?;
        Ok(())
    }
}

impl Decode for Footer {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut off = 0;
        let (index_start, n) = u64::decode_from(&buf[off..])?;
        off += n;
        let (offsets_start, n) = u64::decode_from(&buf[off..])?;
        off += n;
        let (id, n) = u64::decode_from(&buf[off..])?;
        off += n;
        Ok((
            Self {
                index_start,
                offsets_start,
                id,
            },
            off,
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// SSTable
// ------------------------------------------------------------------------------------------------

/// An immutable, memory-mapped, sorted on-disk table.
#[derive(Debug)]
pub struct SSTable {
    /// Identifier inherited from the memtable this table was flushed from.
    id: u64,

    /// The underlying table file.
    file: TableFile,

    /// Packed per-record framing of the payload.
    offsets: Offsets,

    /// Sampled keys bounding each lookup to a narrow record run.
    index: SparseIndex,

    /// Length of the payload region (== footer `offsets_start`).
    payload_len: usize,
}

impl SSTable {
    /// The canonical path of table `id` inside `directory`:
    /// `<directory>/sstable-<id>.sst`.
    pub fn path_for(directory: &Path, id: u64) -> PathBuf {
        directory.join(format!("sstable-{id}.{SST_EXTENSION}"))
    }

    /// Builds and persists a new table from a frozen memtable.
    ///
    /// The whole file — payload, offsets, sparse index, footer — is
    /// assembled in memory and written atomically to
    /// `<directory>/sstable-<id>.sst`.
    ///
    /// # Errors
    ///
    /// - [`SSTableError::Internal`] if the memtable is empty (callers skip
    ///   empty tables).
    /// - I/O errors from file creation.
    pub fn from_memtable(
        id: u64,
        directory: impl AsRef<Path>,
        memtable: &FrozenMemtable,
    ) -> Result<Self, SSTableError> {
        if memtable.is_empty() {
            return Err(SSTableError::Internal(
                "cannot build an SSTable from an empty memtable".into(),
            ));
        }

        // 1. Payload: keys and values back to back, in key order.
        let mut contents = Vec::with_capacity(memtable.size_bytes() + SST_FOOTER_SIZE);
        for (key, value) in memtable.iter() {
            contents.extend_from_slice(key);
            contents.extend_from_slice(value);
        }
        let payload_len = contents.len();

        // 2. Offsets and sparse index over the same key-order walk.
        let offsets = Offsets::from_entries(memtable.iter());
        let index = SparseIndex::from_entries(memtable.iter());

        // 3. Serialize the regions, then the footer locating them.
        let offsets_bytes = offsets.encode()?;
        let index_bytes = index.encode()?;

        let footer = Footer {
            index_start: (payload_len + offsets_bytes.len()) as u64,
            offsets_start: payload_len as u64,
            id,
        };

        contents.extend_from_slice(&offsets_bytes);
        contents.extend_from_slice(&index_bytes);
        footer.encode_to(&mut contents)?;

        // 4. Single atomic write.
        let path = Self::path_for(directory.as_ref(), id);
        let file = TableFile::create(&path, &contents)?;

        info!(
            id,
            path = %path.display(),
            records = offsets.len(),
            bytes = contents.len(),
            "sstable written"
        );

        Ok(Self {
            id,
            file,
            offsets,
            index,
            payload_len,
        })
    }

    /// Reopens a table from its file path.
    ///
    /// Reads the footer from the file tail, then the offsets and
    /// sparse-index regions it locates. The footer id is authoritative;
    /// the filename is not consulted.
    ///
    /// # Errors
    ///
    /// - [`SSTableError::Format`] for a file shorter than the footer, an
    ///   inconsistent region layout, or an offsets region whose length is
    ///   not a whole number of entries.
    /// - [`SSTableError::Io`] for a missing or unreadable file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SSTableError> {
        let file = TableFile::open(&path)?;
        let file_size = file.size();

        if file_size < SST_FOOTER_SIZE {
            return Err(SSTableError::Format(format!(
                "file is {file_size} bytes, smaller than the {SST_FOOTER_SIZE}-byte footer"
            )));
        }

        let footer_bytes = file.read(file_size - SST_FOOTER_SIZE, SST_FOOTER_SIZE)?;
        let (footer, _) = Footer::decode_from(footer_bytes)?;

        let regions_end = (file_size - SST_FOOTER_SIZE) as u64;
        if footer.offsets_start > footer.index_start || footer.index_start > regions_end {
            return Err(SSTableError::Format(format!(
                "inconsistent footer: offsets_start {} index_start {} file regions end {}",
                footer.offsets_start, footer.index_start, regions_end
            )));
        }

        let offsets_region = file.read(
            footer.offsets_start as usize,
            (footer.index_start - footer.offsets_start) as usize,
        )?;
        let offsets = Offsets::decode(offsets_region)?;

        let index_region = file.read(
            footer.index_start as usize,
            (regions_end - footer.index_start) as usize,
        )?;
        let index = SparseIndex::decode(index_region)?;

        Ok(Self {
            id: footer.id,
            file,
            offsets,
            index,
            payload_len: footer.offsets_start as usize,
        })
    }

    /// Returns this table's identifier (from the footer).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of records in this table.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Returns `true` when the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Point lookup.
    ///
    /// The sparse index bounds the candidate records; exactly one
    /// positioned read covers their keys and values, and the offsets array
    /// frames each record within it. A zero-length value (tombstone) is
    /// returned as-is — mapping it to "absent" is the engine's job.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SSTableError> {
        if self.offsets.is_empty() {
            return Ok(None);
        }

        let (start_record, end_record) = self.index.lookup(key);
        // Clamp against the offsets array so a corrupt index cannot send
        // record indices past the table.
        let record_count = end_record
            .unwrap_or(self.offsets.len())
            .min(self.offsets.len());

        if start_record >= record_count {
            // Query key sorts before the first key of the table.
            return Ok(None);
        }

        // Byte range covering every candidate record: from the first
        // candidate's key to the next record's key (or the payload end).
        let start_byte = self.offsets.at(start_record).key_offset as usize;
        let end_byte = if record_count < self.offsets.len() {
            self.offsets.at(record_count).key_offset as usize
        } else {
            self.payload_len
        };
        let block_len = end_byte.checked_sub(start_byte).ok_or_else(|| {
            SSTableError::Format(format!(
                "record range [{start_record}, {record_count}) has reversed byte bounds"
            ))
        })?;
        let block = self.file.read(start_byte, block_len)?;

        for record in start_record..record_count {
            let pair = self.offsets.at(record);
            let key_start = (pair.key_offset as usize).checked_sub(start_byte);
            let key_end = (pair.value_offset as usize).checked_sub(start_byte);
            let (Some(key_start), Some(key_end)) = (key_start, key_end) else {
                return Err(SSTableError::Format(format!(
                    "record {record} offsets precede its block start {start_byte}"
                )));
            };

            if block.get(key_start..key_end) != Some(key) {
                continue;
            }

            let value_end = (self.offsets.value_end(record, self.payload_len) as usize)
                .checked_sub(start_byte)
                .ok_or_else(|| {
                    SSTableError::Format(format!(
                        "record {record} value end precedes its block start {start_byte}"
                    ))
                })?;
            let value = block
                .get(key_end..value_end)
                .ok_or_else(|| {
                    SSTableError::Format(format!(
                        "record {record} value range [{key_end}, {value_end}) escapes its block"
                    ))
                })?
                .to_vec();
            return Ok(Some(value));
        }

        Ok(None)
    }
}
