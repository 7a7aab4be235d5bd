//! Todo items.

use crate::label::Label;
use chrono::{DateTime, Utc};
use facetdb_core::Entid;
use uuid::Uuid;

/// A todo item.
///
/// `completion_date == None` means "not done". Dates at this layer carry
/// whole-second resolution; the list truncates on write.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Entity id in the store.
    pub id: Entid,
    /// Stable identity, used for cross-device addressing.
    pub uuid: Uuid,
    /// Display name.
    pub name: String,
    /// When the item is due, if scheduled.
    pub due_date: Option<DateTime<Utc>>,
    /// When the item was completed, if done.
    pub completion_date: Option<DateTime<Utc>>,
    /// Labels attached to the item.
    pub labels: Vec<Label>,
}

impl Item {
    /// Whether the item has been completed.
    pub fn is_done(&self) -> bool {
        self.completion_date.is_some()
    }
}

/// Three-state patch for an optional attribute.
///
/// Distinguishes "leave as is" from "explicitly clear": only
/// [`Patch::Clear`] retracts the attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Leave the current value untouched.
    #[default]
    Keep,
    /// Set a new value.
    Set(T),
    /// Retract the attribute.
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_follows_completion_date() {
        let mut item = Item {
            id: Entid::new(0x10000),
            uuid: Uuid::new_v4(),
            name: "x".into(),
            due_date: None,
            completion_date: None,
            labels: Vec::new(),
        };
        assert!(!item.is_done());
        item.completion_date = Some(Utc::now());
        assert!(item.is_done());
    }

    #[test]
    fn patch_defaults_to_keep() {
        assert_eq!(Patch::<i32>::default(), Patch::Keep);
    }
}
