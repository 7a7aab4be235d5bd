//! Transaction observers.
//!
//! Observers watch a set of attributes and are invoked with the
//! [`TxReport`] of every committed transaction that touches any of them.
//! The registry is keyed: re-registering a key replaces the previous
//! registration, and `unregister` removes the mapping before returning,
//! so a callback can never fire for a commit that starts after
//! `unregister` returns.

use crate::transaction::TxReport;
use facetdb_codec::Entid;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Callback invoked with the report of a matching commit.
///
/// Callbacks run on the committing thread after the store's write lock
/// has been released. They must not block for long and must not issue
/// writes against the same store from within the callback.
pub type TxObserverCallback = Arc<dyn Fn(&TxReport) + Send + Sync>;

struct Registration {
    attributes: HashSet<Entid>,
    callback: TxObserverCallback,
}

/// A keyed registry of transaction observers.
#[derive(Default)]
pub struct ObserverRegistry {
    inner: RwLock<HashMap<String, Registration>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer under `key`, replacing any previous
    /// registration with the same key atomically.
    pub fn register(
        &self,
        key: impl Into<String>,
        attributes: HashSet<Entid>,
        callback: TxObserverCallback,
    ) {
        self.inner.write().insert(
            key.into(),
            Registration {
                attributes,
                callback,
            },
        );
    }

    /// Removes the registration under `key`.
    ///
    /// Returns true when a registration was removed. The mapping is gone
    /// before this returns.
    pub fn unregister(&self, key: &str) -> bool {
        self.inner.write().remove(key).is_some()
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns true when no observers are registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Collects the callbacks watching any of the report's changed
    /// attributes.
    ///
    /// The snapshot is taken under the read lock; invocation happens at
    /// the caller's leisure, off the lock.
    pub fn matching(&self, report: &TxReport) -> Vec<TxObserverCallback> {
        let inner = self.inner.read();
        inner
            .values()
            .filter(|reg| {
                reg.attributes
                    .iter()
                    .any(|attr| report.changed_attributes.contains(attr))
            })
            .map(|reg| Arc::clone(&reg.callback))
            .collect()
    }

    /// Notifies every observer whose watch set intersects the report.
    pub fn notify(&self, report: &TxReport) {
        for callback in self.matching(report) {
            callback(report);
        }
    }
}
