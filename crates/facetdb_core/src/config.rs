//! Store configuration.

/// Configuration for opening a [`crate::Store`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Create the log file if it does not exist.
    pub create_if_missing: bool,
    /// Call `sync` on the log backend after every commit.
    ///
    /// Turning this off trades durability for commit latency.
    pub sync_on_commit: bool,
}

impl Config {
    /// Sets whether a missing log file is created.
    #[must_use]
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Sets whether commits sync the log to durable storage.
    #[must_use]
    pub fn sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_commit);
    }

    #[test]
    fn builder_style_overrides() {
        let config = Config::default()
            .create_if_missing(false)
            .sync_on_commit(false);
        assert!(!config.create_if_missing);
        assert!(!config.sync_on_commit);
    }
}
