//! Packed per-record offsets region.
//!
//! One `(key_offset, value_offset)` pair per record, in key order, with
//! offsets relative to the start of the payload region. The pairs carry the
//! complete framing of the payload:
//!
//! - key length of record *i* = `value_offset[i] − key_offset[i]`
//! - value length of record *i* = `key_offset[i+1] − value_offset[i]`,
//!   with the last record's value running to the end of the payload.

use crate::encoding::{Decode, Encode, U64_SIZE};

use super::SSTableError;

/// Encoded size of one offsets entry: two little-endian `u64`s.
pub(crate) const OFFSETS_ENTRY_SIZE: usize = 2 * U64_SIZE;

/// Byte positions of one record within the payload region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OffsetPair {
    /// First byte of the record's key.
    pub(crate) key_offset: u64,

    /// First byte of the record's value (== end of the key).
    pub(crate) value_offset: u64,
}

/// The packed offsets array for a whole table.
#[derive(Debug)]
pub(crate) struct Offsets {
    pairs: Vec<OffsetPair>,
}

impl Offsets {
    /// Builds the offsets array by walking entries in key order, mirroring
    /// the payload layout (`k0 v0 k1 v1 …`, no framing bytes).
    pub(crate) fn from_entries<'a>(entries: impl Iterator<Item = (&'a [u8], &'a [u8])>) -> Self {
        let mut pairs = Vec::new();
        let mut cursor = 0u64;

        for (key, value) in entries {
            pairs.push(OffsetPair {
                key_offset: cursor,
                value_offset: cursor + key.len() as u64,
            });
            cursor += (key.len() + value.len()) as u64;
        }

        Self { pairs }
    }

    /// Serializes the array as two little-endian `u64`s per entry.
    pub(crate) fn encode(&self) -> Result<Vec<u8>, SSTableError> {
        let mut buf = Vec::with_capacity(self.pairs.len() * OFFSETS_ENTRY_SIZE);
        for pair in &self.pairs {
            pair.key_offset.encode_to(&mut buf)?;
            pair.value_offset.encode_to(&mut buf)?;
        }
        Ok(buf)
    }

    /// Decodes a raw offsets region.
    ///
    /// The region length must be a multiple of one entry
    /// ([`OFFSETS_ENTRY_SIZE`]); anything else is a format error.
    pub(crate) fn decode(buf: &[u8]) -> Result<Self, SSTableError> {
        if buf.len() % OFFSETS_ENTRY_SIZE != 0 {
            return Err(SSTableError::Format(format!(
                "offsets region length {} is not a multiple of {OFFSETS_ENTRY_SIZE}",
                buf.len()
            )));
        }

        let mut pairs = Vec::with_capacity(buf.len() / OFFSETS_ENTRY_SIZE);
        let mut cursor = 0;
        while cursor < buf.len() {
            let (key_offset, n) = u64::decode_from(&buf[cursor..])?;
            cursor += n;
            let (value_offset, n) = u64::decode_from(&buf[cursor..])?;
            cursor += n;
            pairs.push(OffsetPair {
                key_offset,
                value_offset,
            });
        }

        Ok(Self { pairs })
    }

    /// Number of records.
    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` when the table has no records.
    pub(crate) fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The offsets pair of record `index`.
    pub(crate) fn at(&self, index: usize) -> OffsetPair {
        self.pairs[index]
    }

    /// End of record `index`'s value: the next record's key offset, or the
    /// payload length for the last record.
    pub(crate) fn value_end(&self, index: usize, payload_len: usize) -> u64 {
        match self.pairs.get(index + 1) {
            Some(next) => next.key_offset,
            None => payload_len as u64,
        }
    }
}
