//! Clause-at-a-time query evaluation.
//!
//! Each pattern clause is unified against the store's attribute-first
//! index, carrying a set of candidate environments forward. The result
//! projects the find variables, in find order, over the surviving
//! environments, with duplicate rows removed.

use crate::error::{QueryError, QueryResult};
use crate::parse::{Element, ParsedQuery, Pattern};
use crate::results::RelResult;
use facetdb_codec::TypedValue;
use facetdb_core::Store;
use std::collections::{HashMap, HashSet};

type Env = HashMap<String, TypedValue>;

/// Evaluates a parsed query against a store.
///
/// `bindings` seeds the environments with the `:in` values; callers
/// validate that every declared input is present before calling.
pub(crate) fn evaluate(
    store: &Store,
    query: &ParsedQuery,
    bindings: &HashMap<String, TypedValue>,
) -> QueryResult<RelResult> {
    let mut envs: Vec<Env> = vec![bindings.clone()];

    for clause in &query.clauses {
        envs = solve_clause(store, clause, envs)?;
        if envs.is_empty() {
            break;
        }
    }

    let mut rows = Vec::with_capacity(envs.len());
    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    for env in envs {
        let mut row = Vec::with_capacity(query.find.len());
        for var in &query.find {
            let value = env
                .get(var)
                .cloned()
                .ok_or_else(|| QueryError::UnboundFind { name: var.clone() })?;
            row.push(value);
        }
        // Rel results are sets: drop duplicate rows, preserving the
        // first-seen order.
        let key = row_key(&row);
        if seen.insert(key) {
            rows.push(row);
        }
    }

    Ok(RelResult::new(query.find.len(), rows))
}

fn solve_clause(store: &Store, clause: &Pattern, envs: Vec<Env>) -> QueryResult<Vec<Env>> {
    let datoms = store.datoms_for_attribute(&clause.attribute)?;

    let mut next = Vec::new();
    for env in envs {
        for (entity, value) in &datoms {
            let entity_value = TypedValue::Ref(*entity);
            let Some(env) = unify(&env, &clause.entity, &entity_value) else {
                continue;
            };
            let Some(env) = unify(&env, &clause.value, value) else {
                continue;
            };
            next.push(env);
        }
    }
    Ok(next)
}

/// Attempts to unify one clause position with a concrete value,
/// returning the possibly-extended environment on success.
fn unify(env: &Env, element: &Element, actual: &TypedValue) -> Option<Env> {
    match element {
        Element::Constant(expected) => {
            if expected == actual {
                Some(env.clone())
            } else {
                None
            }
        }
        Element::Variable(name) => match env.get(name) {
            Some(bound) => {
                if bound == actual {
                    Some(env.clone())
                } else {
                    None
                }
            }
            None => {
                let mut extended = env.clone();
                extended.insert(name.clone(), actual.clone());
                Some(extended)
            }
        },
    }
}

fn row_key(row: &[TypedValue]) -> Vec<u8> {
    let mut encoder = facetdb_codec::ValueEncoder::new();
    for value in row {
        encoder.encode(value);
    }
    encoder.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_query;
    use facetdb_codec::{Keyword, ValueType};
    use facetdb_core::{AttributeDef, TxBuilder, Vocabulary};
    use uuid::Uuid;

    fn store_with_items(names: &[&str]) -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .ensure_vocabulary(&Vocabulary::new(
                "todo",
                1,
                vec![
                    (
                        Keyword::new("todo", "uuid"),
                        AttributeDef::of(ValueType::Uuid).unique_identity().indexed().build(),
                    ),
                    (
                        Keyword::new("todo", "name"),
                        AttributeDef::of(ValueType::Text).build(),
                    ),
                ],
            ))
            .unwrap();
        for name in names {
            let mut tx = TxBuilder::new();
            tx.add_temp("i", Keyword::new("todo", "uuid"), Uuid::new_v4())
                .add_temp("i", Keyword::new("todo", "name"), *name);
            store.transact(tx).unwrap();
        }
        store
    }

    #[test]
    fn join_across_clauses() {
        let store = store_with_items(&["milk", "bread"]);
        let query = parse_query(
            r#"[:find ?eid ?uuid ?name
                :where
                [?eid :todo/uuid ?uuid]
                [?eid :todo/name ?name]]"#,
        )
        .unwrap();

        let result = evaluate(&store, &query, &HashMap::new()).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.width(), 3);
    }

    #[test]
    fn constant_value_filters() {
        let store = store_with_items(&["milk", "bread"]);
        let query = parse_query(
            r#"[:find ?eid
                :where [?eid :todo/name "milk"]]"#,
        )
        .unwrap();

        let result = evaluate(&store, &query, &HashMap::new()).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn input_binding_filters() {
        let store = store_with_items(&["milk", "bread"]);
        let query = parse_query(
            r#"[:find ?eid
                :in ?name
                :where [?eid :todo/name ?name]]"#,
        )
        .unwrap();

        let mut bindings = HashMap::new();
        bindings.insert("?name".to_string(), TypedValue::Text("bread".into()));
        let result = evaluate(&store, &query, &bindings).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn no_matches_is_empty_not_error() {
        let store = store_with_items(&[]);
        let query = parse_query(
            r#"[:find ?eid ?name
                :where
                [?eid :todo/name ?name]]"#,
        )
        .unwrap();

        let result = evaluate(&store, &query, &HashMap::new()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn find_var_missing_from_clauses_errors() {
        let store = store_with_items(&["milk"]);
        let query = parse_query(
            r#"[:find ?other
                :where [?eid :todo/name ?name]]"#,
        )
        .unwrap();

        assert!(matches!(
            evaluate(&store, &query, &HashMap::new()),
            Err(QueryError::UnboundFind { .. })
        ));
    }

    #[test]
    fn unknown_attribute_errors() {
        let store = store_with_items(&[]);
        let query = parse_query(
            r#"[:find ?eid
                :where [?eid :todo/bogus ?v]]"#,
        )
        .unwrap();

        assert!(matches!(
            evaluate(&store, &query, &HashMap::new()),
            Err(QueryError::Core(_))
        ));
    }
}
