//! File abstraction for SSTable storage.
//!
//! A [`TableFile`] is written exactly once and read many times. Creation is
//! atomic: bytes are written to a `.tmp` sibling, fsync'd, and renamed into
//! place, so a crash can never leave a partially-written table behind.
//! After creation the file is memory-mapped read-only; positioned reads are
//! bounds-checked slices of the map.

use std::{
    fs::{File, OpenOptions, rename},
    io::Write,
    path::Path,
};

use memmap2::Mmap;
use tracing::trace;

use super::SSTableError;

/// An immutable, memory-mapped table file.
///
/// # Safety
///
/// Uses `unsafe { Mmap::map(...) }` but is memory-safe because:
///
/// - The file is never written after creation (immutable)
/// - The mmap is read-only
/// - Every read is bounds-checked before slicing
#[derive(Debug)]
pub(crate) struct TableFile {
    mmap: Mmap,
}

impl TableFile {
    /// Atomically materializes a file with the given contents and opens it.
    ///
    /// Writes to `<path>.tmp`, fsyncs, then renames onto the final path, so
    /// readers either see the complete file or no file at all.
    pub(crate) fn create(path: impl AsRef<Path>, bytes: &[u8]) -> Result<Self, SSTableError> {
        let final_path = path.as_ref();
        let tmp_path = final_path.with_extension("tmp");

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);

        rename(&tmp_path, final_path)?;

        trace!(path = %final_path.display(), bytes = bytes.len(), "table file created");

        Self::open(final_path)
    }

    /// Opens an existing table file for positioned reads.
    pub(crate) fn open(path: impl AsRef<Path>) -> Result<Self, SSTableError> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }

    /// Returns the bytes in `[offset, offset + len)`.
    ///
    /// A range extending past the end of the file is a
    /// [`SSTableError::ShortRead`], never a truncated slice.
    pub(crate) fn read(&self, offset: usize, len: usize) -> Result<&[u8], SSTableError> {
        let end = offset.checked_add(len).ok_or(SSTableError::ShortRead {
            offset,
            len,
            file_size: self.mmap.len(),
        })?;

        if end > self.mmap.len() {
            return Err(SSTableError::ShortRead {
                offset,
                len,
                file_size: self.mmap.len(),
            });
        }

        Ok(&self.mmap[offset..end])
    }

    /// Total byte length of the file.
    pub(crate) fn size(&self) -> usize {
        self.mmap.len()
    }
}
