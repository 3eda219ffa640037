//! Sparse in-memory index over the offsets array.
//!
//! The sparse index maps a *sampled subset* of a table's keys to their
//! record indices, bounding every point lookup to a short contiguous run
//! of records (roughly one sample stride worth of payload) instead of a
//! full-table scan.
//!
//! # Sampling policy
//!
//! - The first key is always sampled, at record index 0.
//! - A bytes-since-last-sample accumulator grows by each record's payload
//!   size (key + value) and is reset whenever a key is sampled; a key is
//!   sampled when the accumulator exceeds [`INDEX_SAMPLE_STRIDE`].

use std::{collections::BTreeMap, ops::Bound};

use crate::encoding::{Decode, Encode};

use super::SSTableError;

/// Payload bytes between consecutive sampled keys.
pub(crate) const INDEX_SAMPLE_STRIDE: usize = 4096;

/// Ordered map from sampled key to record index.
#[derive(Debug)]
pub(crate) struct SparseIndex {
    entries: BTreeMap<Vec<u8>, u64>,
}

impl SparseIndex {
    /// Samples keys from entries walked in key order.
    pub(crate) fn from_entries<'a>(entries: impl Iterator<Item = (&'a [u8], &'a [u8])>) -> Self {
        let mut index = BTreeMap::new();
        let mut since_last_sample = 0usize;

        for (record, (key, value)) in entries.enumerate() {
            if record == 0 || since_last_sample > INDEX_SAMPLE_STRIDE {
                index.insert(key.to_vec(), record as u64);
                since_last_sample = 0;
            }
            since_last_sample += key.len() + value.len();
        }

        Self { entries: index }
    }

    /// Bounds the records that may contain `key`.
    ///
    /// Returns `(start_index, end_index)` where `start_index` is the record
    /// index of the greatest sampled key ≤ `key` (0 if none), and
    /// `end_index` is the record index of the least sampled key > `key`
    /// (`None` meaning "end of table").
    pub(crate) fn lookup(&self, key: &[u8]) -> (usize, Option<usize>) {
        let start = self
            .entries
            .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
            .next_back()
            .map(|(_, &index)| index as usize)
            .unwrap_or(0);

        let end = self
            .entries
            .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(_, &index)| index as usize);

        (start, end)
    }

    /// Serializes the index as concatenated
    /// `[key_len: u64][key_bytes][index: u64]` entries.
    pub(crate) fn encode(&self) -> Result<Vec<u8>, SSTableError> {
        let mut buf = Vec::new();
        for (key, index) in &self.entries {
            key.encode_to(&mut buf)?;
            index.encode_to(&mut buf)?;
        }
        Ok(buf)
    }

    /// Decodes entries until the region is exhausted.
    pub(crate) fn decode(buf: &[u8]) -> Result<Self, SSTableError> {
        let mut entries = BTreeMap::new();
        let mut cursor = 0;

        while cursor < buf.len() {
            let (key, n) = Vec::<u8>::decode_from(&buf[cursor..])?;
            cursor += n;
            let (index, n) = u64::decode_from(&buf[cursor..])?;
            cursor += n;
            entries.insert(key, index);
        }

        Ok(Self { entries })
    }

    /// Number of sampled keys.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no keys are sampled (empty table).
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
