//! Log backend trait definition.

use crate::error::StorageResult;

/// A low-level append-only log backend.
///
/// Log backends are **opaque byte stores**: they append, read back, and
/// flush bytes. FacetDB owns all record framing; backends do not
/// understand transactions, datoms, or values.
///
/// # Invariants
///
/// - `append` returns the offset where the data begins
/// - `read_at` returns exactly the bytes previously appended at that offset
/// - after `sync` returns, all appended data survives process termination
/// - backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::MemoryLog`] - tests and ephemeral stores
/// - [`super::FileLog`] - persistent single-file log with an exclusive lock
pub trait LogBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range extends past the current size or an
    /// I/O error occurs.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the log, returning its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Flushes pending writes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the log in bytes.
    ///
    /// This is the offset the next `append` will return.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn len(&self) -> StorageResult<u64>;

    /// Returns true if the log holds no bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Syncs data and metadata to durable storage.
    ///
    /// A stronger guarantee than `flush`: file metadata is durable too.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;
}
