//! The todo application layer over a shared FacetDB store.
//!
//! This crate is the composition the UI talks to: items and labels,
//! written and read through the store's vocabulary, with observer-driven
//! refresh and a sync hook. The [`TodoList`] owns nothing global; it
//! borrows a shared [`Store`] handed in by the composition root.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod item;
mod label;

pub use item::{Item, Patch};
pub use label::Label;

use chrono::{DateTime, TimeZone, Utc};
use facetdb_core::{
    AttributeDef, CoreError, Entid, Keyword, Store, TxBuilder, TxObserverCallback, TypedValue,
    ValueType, Vocabulary,
};
use facetdb_query::{QueryError, Queryable};
use facetdb_sync::{HttpClient, HttpTransport, SyncEngine, SyncOutcome};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for todo operations.
pub type TodoResult<T> = Result<T, TodoError>;

/// Errors the todo layer can produce.
#[derive(Debug, Error)]
pub enum TodoError {
    /// Store-level failure.
    #[error("store error: {0}")]
    Core(#[from] CoreError),

    /// Query failure.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// No item carries the given uuid.
    #[error("item not found: {uuid}")]
    ItemNotFound {
        /// The uuid that matched nothing.
        uuid: Uuid,
    },

    /// No label carries the given name.
    #[error("label not found: {name}")]
    LabelNotFound {
        /// The name that matched nothing.
        name: String,
    },

    /// A query returned a row of an unexpected shape.
    #[error("unexpected query row shape")]
    UnexpectedRow,
}

/// The todo vocabulary.
#[must_use]
pub fn todo_vocabulary() -> Vocabulary {
    Vocabulary::new(
        "todo",
        1,
        vec![
            (
                kw_uuid(),
                AttributeDef::of(ValueType::Uuid)
                    .unique_identity()
                    .indexed()
                    .build(),
            ),
            (kw_name(), AttributeDef::of(ValueType::Text).build()),
            (kw_due_date(), AttributeDef::of(ValueType::Instant).build()),
            (
                kw_completion_date(),
                AttributeDef::of(ValueType::Instant).build(),
            ),
            (kw_label(), AttributeDef::of(ValueType::Ref).many().build()),
            (
                kw_label_name(),
                AttributeDef::of(ValueType::Text)
                    .unique_identity()
                    .indexed()
                    .build(),
            ),
            (kw_label_color(), AttributeDef::of(ValueType::Text).build()),
        ],
    )
}

fn kw_uuid() -> Keyword {
    Keyword::new("todo", "uuid")
}

fn kw_name() -> Keyword {
    Keyword::new("todo", "name")
}

fn kw_due_date() -> Keyword {
    Keyword::new("todo", "due_date")
}

fn kw_completion_date() -> Keyword {
    Keyword::new("todo", "completion_date")
}

fn kw_label() -> Keyword {
    Keyword::new("todo", "label")
}

fn kw_label_name() -> Keyword {
    Keyword::new("label", "name")
}

fn kw_label_color() -> Keyword {
    Keyword::new("label", "color")
}

const ALL_ITEMS: &str = r#"[:find ?eid ?uuid ?name
    :where
    [?eid :todo/uuid ?uuid]
    [?eid :todo/name ?name]]"#;

const ITEM_BY_UUID: &str = r#"[:find [?eid ?uuid ?name]
    :in ?uuid
    :where
    [?eid :todo/uuid ?uuid]
    [?eid :todo/name ?name]]"#;

const DUE_DATE_FOR_ITEM: &str = r#"[:find ?date .
    :in ?uuid
    :where
    [?eid :todo/uuid ?uuid]
    [?eid :todo/due_date ?date]]"#;

const COMPLETION_DATE_FOR_ITEM: &str = r#"[:find ?date .
    :in ?uuid
    :where
    [?eid :todo/uuid ?uuid]
    [?eid :todo/completion_date ?date]]"#;

const ALL_LABELS: &str = r#"[:find ?eid ?name ?color
    :where
    [?eid :label/name ?name]
    [?eid :label/color ?color]]"#;

const LABEL_BY_NAME: &str = r#"[:find [?eid ?name ?color]
    :in ?name
    :where
    [?eid :label/name ?name]
    [?eid :label/color ?color]]"#;

const LABELS_FOR_ITEM: &str = r#"[:find ?l ?name ?color
    :in ?item_uuid
    :where
    [?i :todo/uuid ?item_uuid]
    [?i :todo/label ?l]
    [?l :label/name ?name]
    [?l :label/color ?color]]"#;

const ITEMS_WITH_LABEL: &str = r#"[:find ?eid ?uuid ?name
    :in ?label
    :where
    [?l :label/name ?label]
    [?eid :todo/label ?l]
    [?eid :todo/uuid ?uuid]
    [?eid :todo/name ?name]]"#;

type SharedClient = Arc<dyn HttpClient>;
type SharedEngine = SyncEngine<HttpTransport<SharedClient>>;

/// The todo list over a shared store.
pub struct TodoList {
    store: Arc<Store>,
    client_id: Uuid,
    sync_client: Option<SharedClient>,
    // One engine per server URL, kept so the server cursor survives
    // across sync calls.
    sync_engine: Mutex<Option<(String, SharedEngine)>>,
}

impl TodoList {
    /// Creates a todo list over the store, installing the vocabulary.
    pub fn new(store: Arc<Store>) -> TodoResult<Self> {
        store.ensure_vocabulary(&todo_vocabulary())?;
        Ok(Self {
            store,
            client_id: Uuid::new_v4(),
            sync_client: None,
            sync_engine: Mutex::new(None),
        })
    }

    /// Attaches the HTTP client used by [`TodoList::sync`].
    #[must_use]
    pub fn with_sync_client(mut self, client: SharedClient) -> Self {
        self.sync_client = Some(client);
        self
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Creates an item. The write commits before this returns; there is
    /// no intermediate state to observe.
    pub fn create_item(
        &self,
        name: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> TodoResult<Item> {
        let uuid = Uuid::new_v4();
        tracing::debug!(%uuid, name, "creating item");
        let mut tx = TxBuilder::new();
        tx.add_temp("item", kw_uuid(), uuid)
            .add_temp("item", kw_name(), name);
        if let Some(due) = due_date {
            tx.add_temp("item", kw_due_date(), truncate_to_seconds(due));
        }
        self.store.transact(tx)?;
        self.fetch_item(&uuid)?.ok_or(TodoError::ItemNotFound { uuid })
    }

    /// Fetches every item.
    pub fn fetch_items(&self) -> TodoResult<Vec<Item>> {
        let rows = self.store.q(ALL_ITEMS)?.rel()?;
        rows.into_iter()
            .map(|row| self.item_from_row(&row))
            .collect()
    }

    /// Fetches one item by uuid. Absence is `Ok(None)`.
    pub fn fetch_item(&self, uuid: &Uuid) -> TodoResult<Option<Item>> {
        let row = self
            .store
            .q(ITEM_BY_UUID)?
            .bind_uuid("?uuid", *uuid)?
            .tuple()?;
        match row {
            Some(row) => Ok(Some(self.item_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Updates the scalar attributes of the item carrying `uuid`.
    ///
    /// `name: None` keeps the current name. The date patches are
    /// three-state: [`Patch::Keep`] leaves the attribute, [`Patch::Set`]
    /// writes it (truncated to whole seconds), and [`Patch::Clear`]
    /// retracts it, which for the completion date reopens the item.
    pub fn update_item_by_uuid(
        &self,
        uuid: &Uuid,
        name: Option<&str>,
        due_date: Patch<DateTime<Utc>>,
        completion_date: Patch<DateTime<Utc>>,
    ) -> TodoResult<Item> {
        let item = self
            .fetch_item(uuid)?
            .ok_or(TodoError::ItemNotFound { uuid: *uuid })?;

        let mut tx = TxBuilder::new();
        if let Some(name) = name {
            if name != item.name {
                tx.add(item.id, kw_name(), name);
            }
        }
        patch_date(&mut tx, item.id, kw_due_date(), item.due_date, due_date);
        patch_date(
            &mut tx,
            item.id,
            kw_completion_date(),
            item.completion_date,
            completion_date,
        );

        if !tx.is_empty() {
            self.store.transact(tx)?;
        }
        self.fetch_item(uuid)?
            .ok_or(TodoError::ItemNotFound { uuid: *uuid })
    }

    /// Marks the item done as of now.
    pub fn complete_item(&self, uuid: &Uuid) -> TodoResult<Item> {
        self.update_item_by_uuid(uuid, None, Patch::Keep, Patch::Set(Utc::now()))
    }

    /// Clears the completion date, reopening the item.
    pub fn reopen_item(&self, uuid: &Uuid) -> TodoResult<Item> {
        self.update_item_by_uuid(uuid, None, Patch::Keep, Patch::Clear)
    }

    /// Creates a label, upserting by name.
    pub fn create_label(&self, name: &str, color: &str) -> TodoResult<Label> {
        let mut tx = TxBuilder::new();
        tx.add_temp("label", kw_label_name(), name)
            .add_temp("label", kw_label_color(), color);
        self.store.transact(tx)?;
        self.fetch_label(name)?.ok_or_else(|| TodoError::LabelNotFound {
            name: name.to_string(),
        })
    }

    /// Fetches one label by name. Absence is `Ok(None)`.
    pub fn fetch_label(&self, name: &str) -> TodoResult<Option<Label>> {
        let row = self
            .store
            .q(LABEL_BY_NAME)?
            .bind_string("?name", name)?
            .tuple()?;
        Ok(row.as_deref().and_then(Label::from_row))
    }

    /// Fetches every label.
    pub fn fetch_labels(&self) -> TodoResult<Vec<Label>> {
        let rows = self.store.q(ALL_LABELS)?.rel()?;
        Ok(rows
            .into_iter()
            .filter_map(|row| Label::from_row(&row))
            .collect())
    }

    /// Fetches the labels attached to one item.
    pub fn fetch_labels_for_item(&self, uuid: &Uuid) -> TodoResult<Vec<Label>> {
        let rows = self
            .store
            .q(LABELS_FOR_ITEM)?
            .bind_uuid("?item_uuid", *uuid)?
            .rel()?;
        Ok(rows
            .into_iter()
            .filter_map(|row| Label::from_row(&row))
            .collect())
    }

    /// Fetches the items carrying a label.
    pub fn fetch_items_with_label(&self, label: &Label) -> TodoResult<Vec<Item>> {
        let rows = self
            .store
            .q(ITEMS_WITH_LABEL)?
            .bind_string("?label", &label.name)?
            .rel()?;
        rows.into_iter()
            .map(|row| self.item_from_row(&row))
            .collect()
    }

    /// Replaces the item's label set, adding and retracting refs to
    /// reach the requested state.
    pub fn set_item_labels(&self, uuid: &Uuid, labels: &[Label]) -> TodoResult<()> {
        let item = self
            .fetch_item(uuid)?
            .ok_or(TodoError::ItemNotFound { uuid: *uuid })?;
        let existing = self.fetch_labels_for_item(uuid)?;

        let mut tx = TxBuilder::new();
        for label in labels {
            if !existing.contains(label) {
                tx.add(item.id, kw_label(), label.id);
            }
        }
        for label in &existing {
            if !labels.contains(label) {
                tx.retract(item.id, kw_label(), TypedValue::Ref(label.id));
            }
        }
        if !tx.is_empty() {
            self.store.transact(tx)?;
        }
        Ok(())
    }

    /// Registers a callback for any commit that touches item attributes.
    ///
    /// The callback runs on the committing thread; hand the report off
    /// to your own dispatch context before touching UI state.
    pub fn on_items_changed(
        &self,
        key: &str,
        callback: TxObserverCallback,
    ) -> TodoResult<()> {
        self.store.register_observer(
            key,
            &[
                kw_uuid(),
                kw_name(),
                kw_due_date(),
                kw_completion_date(),
            ],
            callback,
        )?;
        Ok(())
    }

    /// Removes a previously registered callback.
    pub fn remove_observer(&self, key: &str) -> bool {
        self.store.unregister_observer(key)
    }

    /// Runs one synchronous sync round-trip against the server.
    ///
    /// Failure is a value: an unreachable server, a rejected handshake,
    /// or a missing transport all come back as `ok: false` with a
    /// message, and local data stays as it was.
    pub fn sync(&self, server_id: Uuid, server_url: &str) -> SyncOutcome {
        let Some(client) = &self.sync_client else {
            return SyncOutcome::failure("no sync transport configured");
        };

        let mut guard = self.sync_engine.lock();
        let rebuild = !matches!(guard.as_ref(), Some((url, _)) if url == server_url);
        if rebuild {
            let transport = HttpTransport::new(server_url, Arc::clone(client));
            *guard = Some((
                server_url.to_string(),
                SyncEngine::new(transport, self.client_id),
            ));
        }
        match guard.as_ref() {
            Some((_, engine)) => engine.sync(&self.store, server_id),
            None => SyncOutcome::failure("sync engine unavailable"),
        }
    }

    fn item_from_row(&self, row: &[TypedValue]) -> TodoResult<Item> {
        let id = row
            .first()
            .and_then(TypedValue::as_entid)
            .ok_or(TodoError::UnexpectedRow)?;
        let uuid = row
            .get(1)
            .and_then(TypedValue::as_uuid)
            .ok_or(TodoError::UnexpectedRow)?;
        let name = row
            .get(2)
            .and_then(|v| v.as_text())
            .ok_or(TodoError::UnexpectedRow)?
            .to_string();

        Ok(Item {
            id,
            uuid,
            name,
            due_date: self.date_for(&uuid, DUE_DATE_FOR_ITEM)?,
            completion_date: self.date_for(&uuid, COMPLETION_DATE_FOR_ITEM)?,
            labels: self.fetch_labels_for_item(&uuid)?,
        })
    }

    fn date_for(&self, uuid: &Uuid, query: &str) -> TodoResult<Option<DateTime<Utc>>> {
        let value = self.store.q(query)?.bind_uuid("?uuid", *uuid)?.scalar()?;
        Ok(value.and_then(|v| v.as_instant()))
    }
}

fn patch_date(
    tx: &mut TxBuilder,
    entity: Entid,
    attribute: Keyword,
    current: Option<DateTime<Utc>>,
    patch: Patch<DateTime<Utc>>,
) {
    match patch {
        Patch::Keep => {}
        Patch::Set(date) => {
            let date = truncate_to_seconds(date);
            if current != Some(date) {
                tx.add(entity, attribute, date);
            }
        }
        Patch::Clear => {
            if current.is_some() {
                tx.retract_attribute(entity, attribute);
            }
        }
    }
}

/// Drops sub-second precision, the resolution this layer round-trips.
fn truncate_to_seconds(date: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(date.timestamp(), 0)
        .single()
        .unwrap_or(date)
}
