//! In-memory datom indexes.
//!
//! Two covering orderings (entity-first and attribute-first) plus a
//! unique-value index. All three are kept consistent by the mutation
//! methods; the transaction engine is the only writer.

use facetdb_codec::{Entid, TypedValue};
use std::collections::{BTreeMap, HashMap};

/// The datom indexes backing a store.
#[derive(Debug, Default)]
pub struct Indexes {
    /// entity → attribute → values.
    eav: BTreeMap<Entid, BTreeMap<Entid, Vec<TypedValue>>>,
    /// attribute → entity → values.
    aev: BTreeMap<Entid, BTreeMap<Entid, Vec<TypedValue>>>,
    /// (attribute, value) → owning entity, for unique attributes.
    unique: HashMap<(Entid, TypedValue), Entid>,
}

impl Indexes {
    /// Creates empty indexes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the values of `(entity, attribute)`.
    pub fn values(&self, entity: Entid, attr: Entid) -> &[TypedValue] {
        self.eav
            .get(&entity)
            .and_then(|attrs| attrs.get(&attr))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the first value of `(entity, attribute)`, if any.
    pub fn value(&self, entity: Entid, attr: Entid) -> Option<&TypedValue> {
        self.values(entity, attr).first()
    }

    /// Returns every `(entity, value)` pair carrying the attribute.
    pub fn datoms_for_attribute(&self, attr: Entid) -> Vec<(Entid, TypedValue)> {
        let Some(entities) = self.aev.get(&attr) else {
            return Vec::new();
        };
        entities
            .iter()
            .flat_map(|(e, values)| values.iter().map(|v| (*e, v.clone())))
            .collect()
    }

    /// Looks up the entity owning a unique `(attribute, value)` pair.
    pub fn entid_for_unique(&self, attr: Entid, value: &TypedValue) -> Option<Entid> {
        self.unique.get(&(attr, value.clone())).copied()
    }

    /// Returns true when the exact datom is present.
    pub fn contains(&self, entity: Entid, attr: Entid, value: &TypedValue) -> bool {
        self.values(entity, attr).contains(value)
    }

    /// Asserts a cardinality-one datom, replacing any existing value.
    ///
    /// Returns the replaced value, if there was one.
    pub fn assert_one(
        &mut self,
        entity: Entid,
        attr: Entid,
        value: TypedValue,
        unique: bool,
    ) -> Option<TypedValue> {
        let old = self.retract_all(entity, attr, unique).into_iter().next();
        self.insert(entity, attr, value.clone());
        if unique {
            self.unique.insert((attr, value), entity);
        }
        old
    }

    /// Asserts a cardinality-many datom. Re-asserting is a no-op.
    pub fn assert_many(&mut self, entity: Entid, attr: Entid, value: TypedValue, unique: bool) {
        if self.contains(entity, attr, &value) {
            return;
        }
        self.insert(entity, attr, value.clone());
        if unique {
            self.unique.insert((attr, value), entity);
        }
    }

    /// Retracts one datom. Retracting an absent datom is a no-op.
    ///
    /// Returns true when a datom was removed.
    pub fn retract(
        &mut self,
        entity: Entid,
        attr: Entid,
        value: &TypedValue,
        unique: bool,
    ) -> bool {
        let removed = Self::remove_from(&mut self.eav, entity, attr, value)
            && Self::remove_from(&mut self.aev, attr, entity, value);
        if removed && unique {
            self.unique.remove(&(attr, value.clone()));
        }
        removed
    }

    /// Retracts every value of `(entity, attribute)`.
    ///
    /// Returns the removed values.
    pub fn retract_all(&mut self, entity: Entid, attr: Entid, unique: bool) -> Vec<TypedValue> {
        let removed = self
            .eav
            .get_mut(&entity)
            .and_then(|attrs| attrs.remove(&attr))
            .unwrap_or_default();
        if let Some(entities) = self.aev.get_mut(&attr) {
            entities.remove(&entity);
        }
        if unique {
            for value in &removed {
                self.unique.remove(&(attr, value.clone()));
            }
        }
        removed
    }

    /// Total number of datoms held.
    pub fn datom_count(&self) -> usize {
        self.eav
            .values()
            .flat_map(|attrs| attrs.values())
            .map(Vec::len)
            .sum()
    }

    fn insert(&mut self, entity: Entid, attr: Entid, value: TypedValue) {
        self.eav
            .entry(entity)
            .or_default()
            .entry(attr)
            .or_default()
            .push(value.clone());
        self.aev
            .entry(attr)
            .or_default()
            .entry(entity)
            .or_default()
            .push(value);
    }

    fn remove_from(
        map: &mut BTreeMap<Entid, BTreeMap<Entid, Vec<TypedValue>>>,
        outer: Entid,
        inner: Entid,
        value: &TypedValue,
    ) -> bool {
        let Some(attrs) = map.get_mut(&outer) else {
            return false;
        };
        let Some(values) = attrs.get_mut(&inner) else {
            return false;
        };
        let Some(pos) = values.iter().position(|v| v == value) else {
            return false;
        };
        values.remove(pos);
        if values.is_empty() {
            attrs.remove(&inner);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const E: Entid = Entid::new(0x10000);
    const E2: Entid = Entid::new(0x10001);
    const A: Entid = Entid::new(1);

    #[test]
    fn assert_one_replaces() {
        let mut idx = Indexes::new();
        assert_eq!(idx.assert_one(E, A, TypedValue::Long(1), false), None);
        assert_eq!(
            idx.assert_one(E, A, TypedValue::Long(2), false),
            Some(TypedValue::Long(1))
        );
        assert_eq!(idx.values(E, A), &[TypedValue::Long(2)]);
        assert_eq!(idx.datom_count(), 1);
    }

    #[test]
    fn assert_many_accumulates() {
        let mut idx = Indexes::new();
        idx.assert_many(E, A, TypedValue::Long(1), false);
        idx.assert_many(E, A, TypedValue::Long(2), false);
        idx.assert_many(E, A, TypedValue::Long(1), false);
        assert_eq!(idx.values(E, A).len(), 2);
    }

    #[test]
    fn retract_absent_is_noop() {
        let mut idx = Indexes::new();
        assert!(!idx.retract(E, A, &TypedValue::Long(1), false));
    }

    #[test]
    fn retract_removes_everywhere() {
        let mut idx = Indexes::new();
        idx.assert_one(E, A, TypedValue::Long(1), false);
        assert!(idx.retract(E, A, &TypedValue::Long(1), false));
        assert!(idx.values(E, A).is_empty());
        assert!(idx.datoms_for_attribute(A).is_empty());
    }

    #[test]
    fn unique_index_tracks_owner() {
        let mut idx = Indexes::new();
        let v = TypedValue::Text("x".into());
        idx.assert_one(E, A, v.clone(), true);
        assert_eq!(idx.entid_for_unique(A, &v), Some(E));

        // Replacing the value releases the old unique entry.
        idx.assert_one(E, A, TypedValue::Text("y".into()), true);
        assert_eq!(idx.entid_for_unique(A, &v), None);
    }

    #[test]
    fn datoms_for_attribute_spans_entities() {
        let mut idx = Indexes::new();
        idx.assert_one(E, A, TypedValue::Long(1), false);
        idx.assert_one(E2, A, TypedValue::Long(2), false);
        let datoms = idx.datoms_for_attribute(A);
        assert_eq!(datoms.len(), 2);
        assert!(datoms.contains(&(E, TypedValue::Long(1))));
        assert!(datoms.contains(&(E2, TypedValue::Long(2))));
    }

    #[test]
    fn retract_all_returns_removed() {
        let mut idx = Indexes::new();
        idx.assert_many(E, A, TypedValue::Long(1), false);
        idx.assert_many(E, A, TypedValue::Long(2), false);
        let removed = idx.retract_all(E, A, false);
        assert_eq!(removed.len(), 2);
        assert!(idx.values(E, A).is_empty());
    }
}
