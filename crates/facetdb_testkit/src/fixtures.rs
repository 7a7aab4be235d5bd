//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores with the
//! todo vocabulary that the integration scenarios share.

use facetdb_codec::{Entid, Keyword, TypedValue, ValueType};
use facetdb_core::{AttributeDef, Store, TxBuilder, Vocabulary};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// The todo item vocabulary used across the workspace's tests.
#[must_use]
pub fn todo_vocabulary() -> Vocabulary {
    Vocabulary::new(
        "todo",
        1,
        vec![
            (
                Keyword::new("todo", "uuid"),
                AttributeDef::of(ValueType::Uuid)
                    .unique_identity()
                    .indexed()
                    .build(),
            ),
            (
                Keyword::new("todo", "name"),
                AttributeDef::of(ValueType::Text).build(),
            ),
            (
                Keyword::new("todo", "due_date"),
                AttributeDef::of(ValueType::Instant).build(),
            ),
            (
                Keyword::new("todo", "completion_date"),
                AttributeDef::of(ValueType::Instant).build(),
            ),
            (
                Keyword::new("todo", "label"),
                AttributeDef::of(ValueType::Ref).many().build(),
            ),
            (
                Keyword::new("label", "name"),
                AttributeDef::of(ValueType::Text)
                    .unique_identity()
                    .indexed()
                    .build(),
            ),
            (
                Keyword::new("label", "color"),
                AttributeDef::of(ValueType::Text).build(),
            ),
        ],
    )
}

/// Opens an in-memory store with the todo vocabulary installed.
#[must_use]
pub fn todo_store() -> Store {
    let store = Store::open_in_memory().expect("in-memory store opens");
    store
        .ensure_vocabulary(&todo_vocabulary())
        .expect("vocabulary installs");
    store
}

/// As [`todo_store`], wrapped for sharing across threads.
#[must_use]
pub fn shared_todo_store() -> Arc<Store> {
    Arc::new(todo_store())
}

/// A file-backed test store with automatic directory cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// Keeps the temp directory alive until drop.
    _temp_dir: TempDir,
}

impl TestStore {
    /// Creates a file-backed store with the todo vocabulary installed.
    #[must_use]
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("temp directory");
        let store =
            Store::open(&temp_dir.path().join("test.facetlog")).expect("file store opens");
        store
            .ensure_vocabulary(&todo_vocabulary())
            .expect("vocabulary installs");
        Self {
            store,
            _temp_dir: temp_dir,
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Creates a todo item, returning its entid and uuid.
pub fn create_item(store: &Store, name: &str) -> (Entid, Uuid) {
    let uuid = Uuid::new_v4();
    let mut tx = TxBuilder::new();
    tx.add_temp("item", Keyword::new("todo", "uuid"), uuid)
        .add_temp("item", Keyword::new("todo", "name"), name);
    let report = store.transact(tx).expect("item transacts");
    (
        report.resolved_tempid("item").expect("tempid resolves"),
        uuid,
    )
}

/// Fetches an item's name by entid.
pub fn item_name(store: &Store, entity: Entid) -> Option<String> {
    store
        .value_for_attribute(entity, &Keyword::new("todo", "name"))
        .expect("lookup succeeds")
        .and_then(TypedValue::into_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_store_accepts_items() {
        let store = todo_store();
        let (entity, _uuid) = create_item(&store, "fixture item");
        assert_eq!(item_name(&store, entity).as_deref(), Some("fixture item"));
    }

    #[test]
    fn file_store_cleans_up() {
        let test_store = TestStore::file();
        let (entity, _uuid) = create_item(&test_store, "on disk");
        assert!(item_name(&test_store, entity).is_some());
    }
}
