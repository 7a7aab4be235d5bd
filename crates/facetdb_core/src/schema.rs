//! Attribute definitions and the schema registry.
//!
//! Attributes must be defined before they can be asserted. Definitions
//! are grouped into named, versioned vocabularies installed with
//! [`crate::Store::ensure_vocabulary`]; installation is idempotent.

use crate::error::{CoreError, CoreResult};
use facetdb_codec::{Entid, Keyword, ValueType};
use std::collections::HashMap;

/// How many values an attribute may hold per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one value; a new assertion replaces the old.
    One,
    /// A set of values.
    Many,
}

/// Uniqueness constraint on an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    /// No constraint.
    None,
    /// A value may belong to at most one entity; colliding assertions
    /// are rejected.
    Value,
    /// Like [`Uniqueness::Value`], but asserting an existing value under
    /// a tempid resolves to the owning entity (upsert).
    Identity,
}

/// The definition of a single attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    /// Type every asserted value must have.
    pub value_type: ValueType,
    /// Cardinality of the attribute.
    pub cardinality: Cardinality,
    /// Uniqueness constraint.
    pub unique: Uniqueness,
    /// Whether the attribute is indexed for value lookups.
    pub index: bool,
}

impl AttributeDef {
    /// Starts building an attribute definition of the given type.
    pub fn of(value_type: ValueType) -> AttributeBuilder {
        AttributeBuilder {
            def: AttributeDef {
                value_type,
                cardinality: Cardinality::One,
                unique: Uniqueness::None,
                index: false,
            },
        }
    }
}

/// Builder for [`AttributeDef`].
#[derive(Debug, Clone)]
pub struct AttributeBuilder {
    def: AttributeDef,
}

impl AttributeBuilder {
    /// Makes the attribute cardinality-many.
    #[must_use]
    pub fn many(mut self) -> Self {
        self.def.cardinality = Cardinality::Many;
        self
    }

    /// Adds a unique-value constraint.
    #[must_use]
    pub fn unique_value(mut self) -> Self {
        self.def.unique = Uniqueness::Value;
        self
    }

    /// Adds a unique-identity constraint (upsert on tempid assertion).
    #[must_use]
    pub fn unique_identity(mut self) -> Self {
        self.def.unique = Uniqueness::Identity;
        self
    }

    /// Marks the attribute as indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.def.index = true;
        self
    }

    /// Finishes the definition.
    #[must_use]
    pub fn build(self) -> AttributeDef {
        self.def
    }
}

/// A named, versioned set of attribute definitions.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// Vocabulary name, e.g. `"todo"`.
    pub name: String,
    /// Version, for callers that evolve their vocabularies.
    pub version: u32,
    /// The attributes this vocabulary defines.
    pub attributes: Vec<(Keyword, AttributeDef)>,
}

impl Vocabulary {
    /// Creates a vocabulary.
    pub fn new(
        name: impl Into<String>,
        version: u32,
        attributes: Vec<(Keyword, AttributeDef)>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            attributes,
        }
    }
}

/// The schema registry: keyword ⇄ entid mapping plus definitions.
#[derive(Debug, Default)]
pub struct Schema {
    by_keyword: HashMap<Keyword, Entid>,
    by_entid: HashMap<Entid, Keyword>,
    defs: HashMap<Entid, AttributeDef>,
    next_attr_id: i64,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_keyword: HashMap::new(),
            by_entid: HashMap::new(),
            defs: HashMap::new(),
            next_attr_id: 1,
        }
    }

    /// Resolves a keyword to its attribute id.
    pub fn attr_id(&self, keyword: &Keyword) -> Option<Entid> {
        self.by_keyword.get(keyword).copied()
    }

    /// Resolves an attribute id back to its keyword.
    pub fn keyword(&self, attr: Entid) -> Option<&Keyword> {
        self.by_entid.get(&attr)
    }

    /// Returns the definition for an attribute id.
    pub fn def(&self, attr: Entid) -> Option<&AttributeDef> {
        self.defs.get(&attr)
    }

    /// Resolves a keyword, erroring when it is not defined.
    pub fn require_attr(&self, keyword: &Keyword) -> CoreResult<(Entid, &AttributeDef)> {
        let id = self
            .attr_id(keyword)
            .ok_or_else(|| CoreError::unknown_attribute(keyword.clone()))?;
        // Defined keywords always carry a definition.
        let def = self.defs.get(&id).ok_or_else(|| {
            CoreError::invalid_state(format!("attribute {keyword} has no definition"))
        })?;
        Ok((id, def))
    }

    /// Installs one attribute definition, allocating its id.
    ///
    /// Re-installation with an identical definition is a no-op and
    /// returns the existing id; a conflicting definition errors.
    pub fn install_attribute(
        &mut self,
        vocabulary: &str,
        keyword: Keyword,
        def: AttributeDef,
    ) -> CoreResult<Entid> {
        if let Some(existing_id) = self.attr_id(&keyword) {
            let existing = &self.defs[&existing_id];
            if *existing == def {
                return Ok(existing_id);
            }
            return Err(CoreError::vocabulary_conflict(
                vocabulary,
                format!("attribute {keyword} is already defined differently"),
            ));
        }

        let id = Entid::new(self.next_attr_id);
        self.next_attr_id += 1;
        self.by_keyword.insert(keyword.clone(), id);
        self.by_entid.insert(id, keyword);
        self.defs.insert(id, def);
        Ok(id)
    }

    /// Number of defined attributes.
    pub fn attribute_count(&self) -> usize {
        self.defs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_kw() -> Keyword {
        Keyword::new("todo", "name")
    }

    #[test]
    fn attribute_builder_defaults() {
        let def = AttributeDef::of(ValueType::Text).build();
        assert_eq!(def.cardinality, Cardinality::One);
        assert_eq!(def.unique, Uniqueness::None);
        assert!(!def.index);
    }

    #[test]
    fn attribute_builder_options() {
        let def = AttributeDef::of(ValueType::Uuid)
            .unique_value()
            .indexed()
            .build();
        assert_eq!(def.unique, Uniqueness::Value);
        assert!(def.index);

        let def = AttributeDef::of(ValueType::Ref).many().build();
        assert_eq!(def.cardinality, Cardinality::Many);
    }

    #[test]
    fn install_allocates_sequential_ids() {
        let mut schema = Schema::new();
        let a = schema
            .install_attribute("todo", name_kw(), AttributeDef::of(ValueType::Text).build())
            .unwrap();
        let b = schema
            .install_attribute(
                "todo",
                Keyword::new("todo", "uuid"),
                AttributeDef::of(ValueType::Uuid).build(),
            )
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(schema.attr_id(&name_kw()), Some(a));
        assert_eq!(schema.keyword(a), Some(&name_kw()));
    }

    #[test]
    fn reinstall_identical_is_noop() {
        let mut schema = Schema::new();
        let def = AttributeDef::of(ValueType::Text).build();
        let a = schema
            .install_attribute("todo", name_kw(), def.clone())
            .unwrap();
        let b = schema.install_attribute("todo", name_kw(), def).unwrap();
        assert_eq!(a, b);
        assert_eq!(schema.attribute_count(), 1);
    }

    #[test]
    fn reinstall_conflicting_errors() {
        let mut schema = Schema::new();
        schema
            .install_attribute("todo", name_kw(), AttributeDef::of(ValueType::Text).build())
            .unwrap();
        let result = schema.install_attribute(
            "todo",
            name_kw(),
            AttributeDef::of(ValueType::Long).build(),
        );
        assert!(matches!(
            result,
            Err(CoreError::VocabularyConflict { .. })
        ));
    }

    #[test]
    fn require_attr_unknown_errors() {
        let schema = Schema::new();
        assert!(matches!(
            schema.require_attr(&name_kw()),
            Err(CoreError::UnknownAttribute { .. })
        ));
    }
}
