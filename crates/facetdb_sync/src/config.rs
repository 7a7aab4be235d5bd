//! Sync engine configuration.

/// Configuration for a [`crate::SyncEngine`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum records requested per pull round-trip.
    pub pull_batch: u32,
}

impl SyncConfig {
    /// Sets the pull batch size.
    #[must_use]
    pub fn pull_batch(mut self, batch: u32) -> Self {
        self.pull_batch = batch;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { pull_batch: 256 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_batch() {
        assert_eq!(SyncConfig::default().pull_batch, 256);
    }

    #[test]
    fn builder_override() {
        assert_eq!(SyncConfig::default().pull_batch(16).pull_batch, 16);
    }
}
