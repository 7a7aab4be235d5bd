//! Property-based test generators using proptest.

use facetdb_codec::{Entid, Keyword, TypedValue};
use facetdb_core::USER_ENTID_START;
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for user-partition entids.
pub fn entid_strategy() -> impl Strategy<Value = Entid> {
    (USER_ENTID_START..USER_ENTID_START + 1_000_000).prop_map(Entid::new)
}

/// Strategy for namespaced keywords.
pub fn keyword_strategy() -> impl Strategy<Value = Keyword> {
    ("[a-z]{1,12}", "[a-z_]{1,16}").prop_map(|(ns, name)| Keyword::new(ns, name))
}

/// Strategy for any of the eight typed value kinds.
pub fn typed_value_strategy() -> impl Strategy<Value = TypedValue> {
    prop_oneof![
        any::<i64>().prop_map(TypedValue::Long),
        entid_strategy().prop_map(TypedValue::Ref),
        keyword_strategy().prop_map(TypedValue::Keyword),
        any::<bool>().prop_map(TypedValue::Boolean),
        any::<f64>().prop_map(TypedValue::Double),
        instant_strategy(),
        ".{0,48}".prop_map(TypedValue::Text),
        any::<[u8; 16]>().prop_map(|b| TypedValue::Uuid(Uuid::from_bytes(b))),
    ]
}

/// Strategy for instants within chrono's representable range.
pub fn instant_strategy() -> impl Strategy<Value = TypedValue> {
    (-8_000_000_000_000i64..8_000_000_000_000i64)
        .prop_map(|ms| TypedValue::instant_from_millis(ms).expect("in-range instant"))
}

/// Strategy for plausible item names.
pub fn item_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,40}").expect("valid regex")
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn entids_stay_in_user_partition(entid in entid_strategy()) {
            prop_assert!(entid.as_i64() >= USER_ENTID_START);
        }

        #[test]
        fn keywords_parse_back(keyword in keyword_strategy()) {
            let reparsed = Keyword::parse(&keyword.to_string()).unwrap();
            prop_assert_eq!(reparsed, keyword);
        }

        #[test]
        fn item_names_are_nonempty(name in item_name_strategy()) {
            prop_assert!(!name.is_empty());
        }
    }
}
