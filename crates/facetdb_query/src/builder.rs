//! The query builder.

use crate::error::{QueryError, QueryResult};
use crate::exec::evaluate;
use crate::parse::{normalize_var, parse_query, ParsedQuery};
use crate::results::RelResult;
use chrono::{DateTime, Utc};
use facetdb_codec::{Entid, Keyword, TypedValue};
use facetdb_core::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::warn;
use uuid::Uuid;

/// A prepared query with typed parameter bindings.
///
/// Built by [`crate::Queryable::q`]; the query text is parsed eagerly so
/// syntax errors surface at preparation time. `bind_*` calls attach
/// values for the variables the query declares in `:in`.
///
/// Every execution method takes the builder by value: a builder can be
/// executed at most once, and binding after execution does not exist as
/// a program state. Executing with a declared input still unbound is a
/// [`QueryError::UnboundVariable`].
///
/// The `execute_*` methods run the query on a worker thread and hand the
/// successful result to a handler; on failure the handler is skipped and
/// the failure is logged. The synchronous methods (`rel`, `tuple`,
/// `scalar`, `coll`) return the error value instead.
pub struct QueryBuilder {
    store: Arc<Store>,
    query: ParsedQuery,
    bindings: HashMap<String, TypedValue>,
}

impl QueryBuilder {
    pub(crate) fn new(store: Arc<Store>, text: &str) -> QueryResult<Self> {
        Ok(Self {
            store,
            query: parse_query(text)?,
            bindings: HashMap::new(),
        })
    }

    /// Binds a typed value to an `:in` variable.
    ///
    /// The name may be given with or without its leading `?`.
    pub fn bind(mut self, name: &str, value: impl Into<TypedValue>) -> QueryResult<Self> {
        let var = normalize_var(name);
        if !self.query.inputs.contains(&var) {
            return Err(QueryError::UndeclaredVariable { name: var });
        }
        self.bindings.insert(var, value.into());
        Ok(self)
    }

    /// Binds an `i32`, widened to a long.
    pub fn bind_int(self, name: &str, value: i32) -> QueryResult<Self> {
        self.bind(name, i64::from(value))
    }

    /// Binds a long.
    pub fn bind_long(self, name: &str, value: i64) -> QueryResult<Self> {
        self.bind(name, value)
    }

    /// Binds an entity reference.
    pub fn bind_ref(self, name: &str, value: Entid) -> QueryResult<Self> {
        self.bind(name, value)
    }

    /// Binds the entity id a keyword resolves to, as a reference.
    ///
    /// # Errors
    ///
    /// Errors when the keyword is not a defined attribute.
    pub fn bind_ref_kw(self, name: &str, keyword: &Keyword) -> QueryResult<Self> {
        let entid = self.store.resolve_attribute(keyword)?;
        self.bind(name, entid)
    }

    /// Binds a keyword value.
    pub fn bind_keyword(self, name: &str, value: Keyword) -> QueryResult<Self> {
        self.bind(name, value)
    }

    /// Binds a boolean.
    pub fn bind_bool(self, name: &str, value: bool) -> QueryResult<Self> {
        self.bind(name, value)
    }

    /// Binds a double.
    pub fn bind_double(self, name: &str, value: f64) -> QueryResult<Self> {
        self.bind(name, value)
    }

    /// Binds an instant.
    pub fn bind_instant(self, name: &str, value: DateTime<Utc>) -> QueryResult<Self> {
        self.bind(name, value)
    }

    /// Binds a text value.
    pub fn bind_string(self, name: &str, value: &str) -> QueryResult<Self> {
        self.bind(name, value)
    }

    /// Binds a UUID.
    pub fn bind_uuid(self, name: &str, value: Uuid) -> QueryResult<Self> {
        self.bind(name, value)
    }

    /// Executes and returns the full row set.
    pub fn rel(self) -> QueryResult<RelResult> {
        self.check_inputs()?;
        evaluate(&self.store, &self.query, &self.bindings)
    }

    /// Executes and returns the first row, if any.
    pub fn tuple(self) -> QueryResult<Option<Vec<TypedValue>>> {
        Ok(self.rel()?.into_first())
    }

    /// Executes and returns the first value of the first row, if any.
    pub fn scalar(self) -> QueryResult<Option<TypedValue>> {
        Ok(self.tuple()?.and_then(|row| row.into_iter().next()))
    }

    /// Executes and returns the first column's values.
    pub fn coll(self) -> QueryResult<Vec<TypedValue>> {
        Ok(self.rel()?.into_column(0).unwrap_or_default())
    }

    /// Runs `rel()` on a worker thread, handing the row set to `handler`.
    ///
    /// The calling thread is never blocked. On failure the handler is
    /// not invoked; the failure is logged. The returned handle lets
    /// callers (and tests) join the worker.
    pub fn execute_rel<F>(self, handler: F) -> JoinHandle<()>
    where
        F: FnOnce(RelResult) + Send + 'static,
    {
        thread::spawn(move || match self.rel() {
            Ok(result) => handler(result),
            Err(e) => warn!(error = %e, "query execution failed; skipping handler"),
        })
    }

    /// Runs `tuple()` on a worker thread. See [`QueryBuilder::execute_rel`].
    pub fn execute_tuple<F>(self, handler: F) -> JoinHandle<()>
    where
        F: FnOnce(Option<Vec<TypedValue>>) + Send + 'static,
    {
        thread::spawn(move || match self.tuple() {
            Ok(result) => handler(result),
            Err(e) => warn!(error = %e, "query execution failed; skipping handler"),
        })
    }

    /// Runs `scalar()` on a worker thread. See [`QueryBuilder::execute_rel`].
    pub fn execute_scalar<F>(self, handler: F) -> JoinHandle<()>
    where
        F: FnOnce(Option<TypedValue>) + Send + 'static,
    {
        thread::spawn(move || match self.scalar() {
            Ok(result) => handler(result),
            Err(e) => warn!(error = %e, "query execution failed; skipping handler"),
        })
    }

    /// Runs `coll()` on a worker thread. See [`QueryBuilder::execute_rel`].
    pub fn execute_coll<F>(self, handler: F) -> JoinHandle<()>
    where
        F: FnOnce(Vec<TypedValue>) + Send + 'static,
    {
        thread::spawn(move || match self.coll() {
            Ok(result) => handler(result),
            Err(e) => warn!(error = %e, "query execution failed; skipping handler"),
        })
    }

    fn check_inputs(&self) -> QueryResult<()> {
        for input in &self.query.inputs {
            if !self.bindings.contains_key(input) {
                return Err(QueryError::UnboundVariable {
                    name: input.clone(),
                });
            }
        }
        Ok(())
    }
}
