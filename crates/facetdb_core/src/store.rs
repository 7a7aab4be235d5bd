//! The store facade.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::Indexes;
use crate::log::{self, LogOp, LogRecord, TxRecord};
use crate::observer::{ObserverRegistry, TxObserverCallback};
use crate::schema::{AttributeDef, Cardinality, Schema, Uniqueness, Vocabulary};
use crate::transaction::{Op, TxBuilder, TxReport};
use crate::types::{TxId, USER_ENTID_START};
use chrono::Utc;
use facetdb_codec::{Entid, Keyword, TypedValue};
use facetdb_storage::{FileLog, LogBackend, MemoryLog};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

/// The single owner of a database.
///
/// A `Store` holds the schema, the datom indexes, the transaction log
/// backend, and the observer registry. It is `Send + Sync`; share it
/// across threads with `Arc<Store>`; there is no process-global
/// instance, the composition root decides its lifetime.
///
/// Writers are serialized by the store's internal write lock: two
/// concurrent [`Store::transact`] calls cannot interleave. Readers
/// proceed concurrently.
///
/// # Opening a store
///
/// ```rust,ignore
/// use facetdb_core::Store;
///
/// let store = Store::open(Path::new("todo.facetlog"))?;
/// store.ensure_vocabulary(&vocabulary)?;
/// // ... use the store ...
/// store.close()?;
/// ```
///
/// For tests, use [`Store::open_in_memory`].
pub struct Store {
    state: RwLock<DbState>,
    log: Mutex<Box<dyn LogBackend>>,
    observers: ObserverRegistry,
    config: Config,
    is_open: RwLock<bool>,
}

struct DbState {
    schema: Schema,
    indexes: Indexes,
    next_entid: i64,
    next_tx: TxId,
    tx_log: Vec<TxRecord>,
}

impl DbState {
    fn new() -> Self {
        Self {
            schema: Schema::new(),
            indexes: Indexes::new(),
            next_entid: USER_ENTID_START,
            next_tx: TxId::new(1),
            tx_log: Vec::new(),
        }
    }

    fn note_entid(&mut self, entid: Entid) {
        if entid.as_i64() >= self.next_entid {
            self.next_entid = entid.as_i64() + 1;
        }
    }

    /// Applies a resolved op to the indexes, honoring the attribute's
    /// cardinality and uniqueness. The attribute must be defined.
    fn apply_op(&mut self, op: &LogOp) -> CoreResult<()> {
        let (attr, def) = self.schema.require_attr(op.attribute())?;
        let unique = def.unique != Uniqueness::None;
        match op {
            LogOp::Add(e, _, v) => match def.cardinality {
                Cardinality::One => {
                    self.indexes.assert_one(*e, attr, v.clone(), unique);
                }
                Cardinality::Many => {
                    self.indexes.assert_many(*e, attr, v.clone(), unique);
                }
            },
            LogOp::Retract(e, _, v) => {
                self.indexes.retract(*e, attr, v, unique);
            }
        }
        Ok(())
    }
}

impl Store {
    /// Opens a store backed by a log file at `path`.
    ///
    /// The file is created if missing, locked exclusively, and replayed
    /// to rebuild the schema and indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if another process holds the lock, the log is
    /// corrupted, or I/O fails.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a store with explicit configuration.
    ///
    /// # Errors
    ///
    /// As [`Store::open`]; additionally errors when the file is missing
    /// and `create_if_missing` is false.
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        if !config.create_if_missing && !path.exists() {
            return Err(CoreError::invalid_state(
                "store does not exist and create_if_missing is false",
            ));
        }
        let backend = FileLog::open_with_create_dirs(path)?;
        Self::open_with_backend(config, Box::new(backend))
    }

    /// Opens a fresh in-memory store for testing.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Config::default(), Box::new(MemoryLog::new()))
    }

    /// Opens a store over a pre-configured log backend.
    ///
    /// This is the lower-level constructor; prefer [`Store::open`].
    ///
    /// # Errors
    ///
    /// Returns an error if replaying the log fails.
    pub fn open_with_backend(config: Config, backend: Box<dyn LogBackend>) -> CoreResult<Self> {
        let mut state = DbState::new();
        for record in log::read_records(backend.as_ref())? {
            match record {
                LogRecord::Vocab(vocab) => {
                    for (keyword, def) in vocab.attributes {
                        state.schema.install_attribute(&vocab.name, keyword, def)?;
                    }
                }
                LogRecord::Tx(tx) => {
                    for op in &tx.ops {
                        state.note_entid(op.entity());
                        state.apply_op(op).map_err(|e| {
                            CoreError::log_corruption(format!("replay of {} failed: {e}", tx.tx_id))
                        })?;
                    }
                    state.next_tx = TxId::new(state.next_tx.as_u64().max(tx.tx_id.as_u64() + 1));
                    state.tx_log.push(tx);
                }
            }
        }

        debug!(
            attributes = state.schema.attribute_count(),
            datoms = state.indexes.datom_count(),
            "store opened"
        );

        Ok(Self {
            state: RwLock::new(state),
            log: Mutex::new(backend),
            observers: ObserverRegistry::new(),
            config,
            is_open: RwLock::new(true),
        })
    }

    /// Installs or verifies a vocabulary.
    ///
    /// Idempotent: re-installation with identical definitions is a
    /// no-op; a definition that conflicts with the installed one errors
    /// without side effects.
    pub fn ensure_vocabulary(&self, vocab: &Vocabulary) -> CoreResult<()> {
        self.ensure_open()?;
        let mut state = self.state.write();

        let mut any_new = false;
        for (keyword, def) in &vocab.attributes {
            match state.schema.attr_id(keyword) {
                Some(id) => {
                    if state.schema.def(id) != Some(def) {
                        return Err(CoreError::vocabulary_conflict(
                            &vocab.name,
                            format!("attribute {keyword} is already defined differently"),
                        ));
                    }
                }
                None => any_new = true,
            }
        }
        if !any_new {
            return Ok(());
        }

        for (keyword, def) in &vocab.attributes {
            state
                .schema
                .install_attribute(&vocab.name, keyword.clone(), def.clone())?;
        }
        self.append_record(&log::encode_vocab(vocab))?;

        debug!(vocabulary = %vocab.name, version = vocab.version, "vocabulary installed");
        Ok(())
    }

    /// Commits a transaction.
    ///
    /// Validation (schema, types, uniqueness, tempid resolution) runs
    /// against the pre-transaction state; only a fully valid transaction
    /// mutates the indexes. The committed record is appended to the log
    /// before the indexes change, and matching observers are notified
    /// after the write lock is released.
    ///
    /// # Errors
    ///
    /// Returns an error on unknown attributes, type mismatches, unique
    /// conflicts, or storage failures. On error no state is changed.
    pub fn transact(&self, tx: TxBuilder) -> CoreResult<TxReport> {
        self.ensure_open()?;
        let ops = tx.into_ops();
        let mut state = self.state.write();

        let mut tempids = Self::resolve_tempids(&state, &ops)?;
        let log_ops = Self::resolve_ops(&state, &ops, &mut tempids)?;

        let tx_id = state.next_tx;
        let tx_instant = Utc::now();
        let record = TxRecord {
            tx_id,
            tx_instant,
            ops: log_ops,
        };
        self.append_record(&log::encode_tx(&record))?;

        let report = Self::apply_record(&mut state, &record, tempids)?;
        state.next_tx = tx_id.next();
        state.tx_log.push(record);
        drop(state);

        debug!(tx = %report.tx_id, entities = report.changed_entities.len(), "committed");
        self.observers.notify(&report);
        Ok(report)
    }

    /// Applies pre-resolved operations, typically pulled from a sync
    /// server. Already-present additions and absent retractions are
    /// skipped, making application idempotent.
    ///
    /// Returns `None` when every operation was a no-op (nothing was
    /// committed), otherwise the report of the local commit.
    ///
    /// # Errors
    ///
    /// Returns an error when an operation names an attribute that is not
    /// installed locally, or on storage failure.
    pub fn apply_operations(&self, ops: Vec<LogOp>) -> CoreResult<Option<TxReport>> {
        self.ensure_open()?;
        let mut state = self.state.write();

        let mut effective = Vec::new();
        for op in ops {
            let (attr, _def) = state.schema.require_attr(op.attribute())?;
            let present = match &op {
                LogOp::Add(e, _, v) => state.indexes.contains(*e, attr, v),
                LogOp::Retract(e, _, v) => !state.indexes.contains(*e, attr, v),
            };
            if !present {
                effective.push(op);
            }
        }
        if effective.is_empty() {
            return Ok(None);
        }

        for op in &effective {
            state.note_entid(op.entity());
        }

        let tx_id = state.next_tx;
        let record = TxRecord {
            tx_id,
            tx_instant: Utc::now(),
            ops: effective,
        };
        self.append_record(&log::encode_tx(&record))?;

        let report = Self::apply_record(&mut state, &record, HashMap::new())?;
        state.next_tx = tx_id.next();
        state.tx_log.push(record);
        drop(state);

        self.observers.notify(&report);
        Ok(Some(report))
    }

    /// Synchronous point lookup of a cardinality-one attribute.
    ///
    /// Returns `Ok(None)` when the attribute is unset on the entity;
    /// absence is not an error.
    pub fn value_for_attribute(
        &self,
        entity: Entid,
        attribute: &Keyword,
    ) -> CoreResult<Option<TypedValue>> {
        self.ensure_open()?;
        let state = self.state.read();
        let (attr, _) = state.schema.require_attr(attribute)?;
        Ok(state.indexes.value(entity, attr).cloned())
    }

    /// Returns every value of an attribute on an entity.
    pub fn values_for_attribute(
        &self,
        entity: Entid,
        attribute: &Keyword,
    ) -> CoreResult<Vec<TypedValue>> {
        self.ensure_open()?;
        let state = self.state.read();
        let (attr, _) = state.schema.require_attr(attribute)?;
        Ok(state.indexes.values(entity, attr).to_vec())
    }

    /// Resolves an attribute keyword to its id.
    pub fn resolve_attribute(&self, attribute: &Keyword) -> CoreResult<Entid> {
        self.ensure_open()?;
        let state = self.state.read();
        let (attr, _) = state.schema.require_attr(attribute)?;
        Ok(attr)
    }

    /// Returns every `(entity, value)` pair carrying the attribute.
    pub fn datoms_for_attribute(&self, attribute: &Keyword) -> CoreResult<Vec<(Entid, TypedValue)>> {
        self.ensure_open()?;
        let state = self.state.read();
        let (attr, _) = state.schema.require_attr(attribute)?;
        Ok(state.indexes.datoms_for_attribute(attr))
    }

    /// Looks up the entity owning a unique `(attribute, value)` pair.
    pub fn entid_for_unique(
        &self,
        attribute: &Keyword,
        value: &TypedValue,
    ) -> CoreResult<Option<Entid>> {
        self.ensure_open()?;
        let state = self.state.read();
        let (attr, _) = state.schema.require_attr(attribute)?;
        Ok(state.indexes.entid_for_unique(attr, value))
    }

    /// Registers a transaction observer.
    ///
    /// Attribute keywords are resolved to ids once, here; registering
    /// with an unknown attribute errors. Re-registering a key replaces
    /// the previous registration atomically.
    pub fn register_observer(
        &self,
        key: impl Into<String>,
        attributes: &[Keyword],
        callback: TxObserverCallback,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        let state = self.state.read();
        let mut resolved = HashSet::with_capacity(attributes.len());
        for keyword in attributes {
            let (attr, _) = state.schema.require_attr(keyword)?;
            resolved.insert(attr);
        }
        drop(state);
        self.observers.register(key, resolved, callback);
        Ok(())
    }

    /// Removes the observer registered under `key`.
    ///
    /// The registration is gone before this returns: a transaction
    /// committed after `unregister` returns will not invoke it.
    pub fn unregister_observer(&self, key: &str) -> bool {
        self.observers.unregister(key)
    }

    /// Number of live observer registrations.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Returns committed transaction records with `tx_id > after`.
    pub fn tx_records_since(&self, after: TxId) -> CoreResult<Vec<TxRecord>> {
        self.ensure_open()?;
        let state = self.state.read();
        Ok(state
            .tx_log
            .iter()
            .filter(|tx| tx.tx_id > after)
            .cloned()
            .collect())
    }

    /// Id of the latest committed transaction, or `TxId(0)` when none.
    pub fn latest_tx(&self) -> CoreResult<TxId> {
        self.ensure_open()?;
        let state = self.state.read();
        Ok(state
            .tx_log
            .last()
            .map(|tx| tx.tx_id)
            .unwrap_or(TxId::new(0)))
    }

    /// Total number of datoms held.
    pub fn datom_count(&self) -> CoreResult<usize> {
        self.ensure_open()?;
        Ok(self.state.read().indexes.datom_count())
    }

    /// Flushes the log and closes the store.
    ///
    /// Closing twice is a no-op; any other operation after close fails
    /// with [`CoreError::StoreClosed`].
    pub fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }
        {
            let mut log = self.log.lock();
            log.flush()?;
            log.sync()?;
        }
        *is_open = false;
        debug!("store closed");
        Ok(())
    }

    /// Returns true while the store accepts operations.
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if !*self.is_open.read() {
            return Err(CoreError::StoreClosed);
        }
        Ok(())
    }

    fn append_record(&self, bytes: &[u8]) -> CoreResult<()> {
        let mut log = self.log.lock();
        log.append(bytes)?;
        log.flush()?;
        if self.config.sync_on_commit {
            log.sync()?;
        }
        Ok(())
    }

    /// Resolves each distinct tempid to an entid: a unique-identity
    /// assertion matching an existing entity upserts onto it, otherwise
    /// a fresh entid is allocated. Performed against pre-tx state.
    fn resolve_tempids(state: &DbState, ops: &[Op]) -> CoreResult<HashMap<String, Entid>> {
        let mut resolved: HashMap<String, Entid> = HashMap::new();
        for op in ops {
            let Op::AddTemp(tempid, keyword, value) = op else {
                continue;
            };
            let (attr, def) = state.schema.require_attr(keyword)?;
            if def.unique != Uniqueness::Identity {
                continue;
            }
            if let Some(existing) = state.indexes.entid_for_unique(attr, value) {
                match resolved.get(tempid) {
                    Some(prior) if *prior != existing => {
                        return Err(CoreError::UniqueConflict {
                            attribute: keyword.clone(),
                            existing,
                        });
                    }
                    _ => {
                        resolved.insert(tempid.clone(), existing);
                    }
                }
            }
        }
        Ok(resolved)
    }

    /// Validates ops against the schema and pre-tx indexes and produces
    /// the resolved log form. Tempids that did not upsert get fresh
    /// entids, recorded into `tempids`; attribute-wide retractions
    /// expand to the concrete datoms they remove.
    fn resolve_ops(
        state: &DbState,
        ops: &[Op],
        tempids: &mut HashMap<String, Entid>,
    ) -> CoreResult<Vec<LogOp>> {
        let mut next_entid = state.next_entid;

        let mut log_ops = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                Op::Add(entity, keyword, value) => {
                    Self::check_add(state, *entity, keyword, value)?;
                    log_ops.push(LogOp::Add(*entity, keyword.clone(), value.clone()));
                }
                Op::AddTemp(tempid, keyword, value) => {
                    let entity = match tempids.get(tempid) {
                        Some(existing) => *existing,
                        None => {
                            let id = Entid::new(next_entid);
                            next_entid += 1;
                            tempids.insert(tempid.clone(), id);
                            id
                        }
                    };
                    Self::check_add(state, entity, keyword, value)?;
                    log_ops.push(LogOp::Add(entity, keyword.clone(), value.clone()));
                }
                Op::Retract(entity, keyword, value) => {
                    let (_, def) = state.schema.require_attr(keyword)?;
                    Self::check_type(keyword, def, value)?;
                    log_ops.push(LogOp::Retract(*entity, keyword.clone(), value.clone()));
                }
                Op::RetractAttribute(entity, keyword) => {
                    let (attr, _) = state.schema.require_attr(keyword)?;
                    for value in state.indexes.values(*entity, attr) {
                        log_ops.push(LogOp::Retract(*entity, keyword.clone(), value.clone()));
                    }
                }
            }
        }
        Ok(log_ops)
    }

    fn check_add(
        state: &DbState,
        entity: Entid,
        keyword: &Keyword,
        value: &TypedValue,
    ) -> CoreResult<()> {
        let (attr, def) = state.schema.require_attr(keyword)?;
        Self::check_type(keyword, def, value)?;
        if def.unique != Uniqueness::None {
            if let Some(owner) = state.indexes.entid_for_unique(attr, value) {
                if owner != entity {
                    return Err(CoreError::UniqueConflict {
                        attribute: keyword.clone(),
                        existing: owner,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_type(keyword: &Keyword, def: &AttributeDef, value: &TypedValue) -> CoreResult<()> {
        if value.value_type() != def.value_type {
            return Err(CoreError::TypeMismatch {
                attribute: keyword.clone(),
                expected: def.value_type,
                actual: value.value_type(),
            });
        }
        Ok(())
    }

    /// Applies a validated record to the indexes and builds its report.
    fn apply_record(
        state: &mut DbState,
        record: &TxRecord,
        tempids: HashMap<String, Entid>,
    ) -> CoreResult<TxReport> {
        let mut changed_entities = Vec::new();
        let mut changed_attributes = HashSet::new();
        for op in &record.ops {
            state.apply_op(op)?;
            state.note_entid(op.entity());
            if !changed_entities.contains(&op.entity()) {
                changed_entities.push(op.entity());
            }
            if let Some(attr) = state.schema.attr_id(op.attribute()) {
                changed_attributes.insert(attr);
            }
        }
        Ok(TxReport {
            tx_id: record.tx_id,
            tx_instant: record.tx_instant,
            changed_entities,
            changed_attributes,
            tempids,
        })
    }
}
