//! Item labels.

use facetdb_core::{Entid, TypedValue};

/// A label that can be attached to items.
///
/// Labels are identified by name: creating a label with an existing
/// name upserts onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Entity id in the store.
    pub id: Entid,
    /// Unique display name.
    pub name: String,
    /// Display color, e.g. `"#ff0000"`.
    pub color: String,
}

impl Label {
    /// Builds a label from a `[?eid ?name ?color]` query row.
    ///
    /// Returns `None` when the row does not have that shape.
    pub fn from_row(row: &[TypedValue]) -> Option<Self> {
        let id = row.first()?.as_entid()?;
        let name = row.get(1)?.as_text()?.to_string();
        let color = row.get(2)?.as_text()?.to_string();
        Some(Self { id, name, color })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_row_reads_columns() {
        let row = vec![
            TypedValue::Ref(Entid::new(7)),
            TypedValue::Text("chores".into()),
            TypedValue::Text("#00ff00".into()),
        ];
        let label = Label::from_row(&row).unwrap();
        assert_eq!(label.id, Entid::new(7));
        assert_eq!(label.name, "chores");
        assert_eq!(label.color, "#00ff00");
    }

    #[test]
    fn from_row_rejects_wrong_shape() {
        let row = vec![TypedValue::Long(1), TypedValue::Long(2)];
        assert!(Label::from_row(&row).is_none());
    }
}
