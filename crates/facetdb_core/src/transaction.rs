//! Transaction building and reports.

use crate::types::TxId;
use chrono::{DateTime, Utc};
use facetdb_codec::{Entid, Keyword, TypedValue};
use std::collections::{HashMap, HashSet};

/// One operation inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Assert a datom on an existing entity.
    Add(Entid, Keyword, TypedValue),
    /// Assert a datom on a tempid, resolved to an entid at commit.
    AddTemp(String, Keyword, TypedValue),
    /// Retract one datom. Retracting an absent datom is a no-op.
    Retract(Entid, Keyword, TypedValue),
    /// Retract every value of an attribute on an entity.
    RetractAttribute(Entid, Keyword),
}

/// A builder accumulating the operations of one transaction.
///
/// Tempids name entities that do not exist yet; each distinct tempid
/// resolves to one fresh entid at commit, unless a unique-identity
/// assertion upserts it onto an existing entity.
///
/// # Example
///
/// ```rust,ignore
/// let mut tx = TxBuilder::new();
/// tx.add_temp("item", kw!(":todo/name"), "Buy milk")
///   .add_temp("item", kw!(":todo/uuid"), uuid);
/// let report = store.transact(tx)?;
/// let entity = report.tempids["item"];
/// ```
#[derive(Debug, Default)]
pub struct TxBuilder {
    ops: Vec<Op>,
}

impl TxBuilder {
    /// Creates an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asserts `(entity, attribute, value)`.
    pub fn add(
        &mut self,
        entity: Entid,
        attribute: Keyword,
        value: impl Into<TypedValue>,
    ) -> &mut Self {
        self.ops.push(Op::Add(entity, attribute, value.into()));
        self
    }

    /// Asserts a datom on a tempid.
    pub fn add_temp(
        &mut self,
        tempid: impl Into<String>,
        attribute: Keyword,
        value: impl Into<TypedValue>,
    ) -> &mut Self {
        self.ops
            .push(Op::AddTemp(tempid.into(), attribute, value.into()));
        self
    }

    /// Retracts one datom.
    pub fn retract(
        &mut self,
        entity: Entid,
        attribute: Keyword,
        value: impl Into<TypedValue>,
    ) -> &mut Self {
        self.ops.push(Op::Retract(entity, attribute, value.into()));
        self
    }

    /// Retracts every value of an attribute on an entity.
    pub fn retract_attribute(&mut self, entity: Entid, attribute: Keyword) -> &mut Self {
        self.ops.push(Op::RetractAttribute(entity, attribute));
        self
    }

    /// Returns the accumulated operations.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Returns true when no operations have been added.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn into_ops(self) -> Vec<Op> {
        self.ops
    }
}

/// The report produced by every successful write transaction.
#[derive(Debug, Clone)]
pub struct TxReport {
    /// Id of the committed transaction.
    pub tx_id: TxId,
    /// When the transaction committed.
    pub tx_instant: DateTime<Utc>,
    /// Entities touched by the transaction, in first-touch order.
    pub changed_entities: Vec<Entid>,
    /// Attribute ids touched by the transaction.
    pub changed_attributes: HashSet<Entid>,
    /// Resolution of every tempid used in the transaction.
    pub tempids: HashMap<String, Entid>,
}

impl TxReport {
    /// Returns the entid a tempid resolved to.
    pub fn resolved_tempid(&self, tempid: &str) -> Option<Entid> {
        self.tempids.get(tempid).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_in_order() {
        let mut tx = TxBuilder::new();
        tx.add_temp("t0", Keyword::new("todo", "name"), "milk")
            .retract_attribute(Entid::new(0x10000), Keyword::new("todo", "due_date"));

        assert_eq!(tx.ops().len(), 2);
        assert!(matches!(tx.ops()[0], Op::AddTemp(..)));
        assert!(matches!(tx.ops()[1], Op::RetractAttribute(..)));
    }

    #[test]
    fn empty_builder() {
        assert!(TxBuilder::new().is_empty());
    }
}
