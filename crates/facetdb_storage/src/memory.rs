//! In-memory log backend for testing and ephemeral stores.

use crate::backend::LogBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory log backend.
///
/// Suitable for unit tests, integration tests, and ephemeral stores that
/// do not need persistence. Thread-safe.
///
/// # Example
///
/// ```rust
/// use facetdb_storage::{LogBackend, MemoryLog};
///
/// let mut log = MemoryLog::new();
/// let offset = log.append(b"record").unwrap();
/// assert_eq!(offset, 0);
/// assert_eq!(log.len().unwrap(), 6);
/// ```
#[derive(Debug, Default)]
pub struct MemoryLog {
    data: RwLock<Vec<u8>>,
}

impl MemoryLog {
    /// Creates a new empty in-memory log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory log preloaded with data.
    ///
    /// Useful for replay tests.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of the full log contents.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl LogBackend for MemoryLog {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[start..end].to_vec())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn len(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_log_is_empty() {
        let log = MemoryLog::new();
        assert_eq!(log.len().unwrap(), 0);
        assert!(log.is_empty().unwrap());
    }

    #[test]
    fn append_returns_offsets() {
        let mut log = MemoryLog::new();
        assert_eq!(log.append(b"hello").unwrap(), 0);
        assert_eq!(log.append(b" world").unwrap(), 5);
        assert_eq!(log.len().unwrap(), 11);
    }

    #[test]
    fn read_at_returns_appended_bytes() {
        let mut log = MemoryLog::new();
        log.append(b"hello world").unwrap();
        assert_eq!(log.read_at(0, 5).unwrap(), b"hello");
        assert_eq!(log.read_at(6, 5).unwrap(), b"world");
    }

    #[test]
    fn read_past_end_fails() {
        let mut log = MemoryLog::new();
        log.append(b"hello").unwrap();
        assert!(matches!(
            log.read_at(10, 5),
            Err(StorageError::ReadPastEnd { .. })
        ));
        assert!(matches!(
            log.read_at(3, 10),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn preloaded_data() {
        let log = MemoryLog::with_data(b"replayed".to_vec());
        assert_eq!(log.len().unwrap(), 8);
        assert_eq!(log.read_at(0, 8).unwrap(), b"replayed");
    }
}
