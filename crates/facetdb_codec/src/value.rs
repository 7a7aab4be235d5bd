//! The typed value model.

use crate::keyword::Keyword;
use chrono::{DateTime, Utc};
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// An entity id.
///
/// Entids are opaque 64-bit identifiers. They are assigned by the store
/// when an entity is first asserted and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entid(pub i64);

impl Entid {
    /// Creates an entid from its raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Entid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entid:{}", self.0)
    }
}

/// The eight value kinds a [`TypedValue`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 64-bit signed integer.
    Long,
    /// Reference to another entity.
    Ref,
    /// Namespaced keyword.
    Keyword,
    /// Boolean.
    Boolean,
    /// 64-bit float.
    Double,
    /// Instant in time, millisecond resolution.
    Instant,
    /// UTF-8 text.
    Text,
    /// UUID.
    Uuid,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Long => "long",
            ValueType::Ref => "ref",
            ValueType::Keyword => "keyword",
            ValueType::Boolean => "boolean",
            ValueType::Double => "double",
            ValueType::Instant => "instant",
            ValueType::Text => "text",
            ValueType::Uuid => "uuid",
        };
        f.write_str(name)
    }
}

/// A dynamically typed value.
///
/// Exactly one variant is populated; the discriminant is the enum tag, so
/// there is no "wrong accessor" failure mode: a mismatched accessor
/// returns `None` and callers pattern-match exhaustively.
///
/// Instants carry millisecond resolution. Callers that need coarser
/// resolution (the todo layer stores whole seconds) truncate before
/// asserting.
#[derive(Debug, Clone)]
pub enum TypedValue {
    /// 64-bit signed integer.
    Long(i64),
    /// Reference to another entity.
    Ref(Entid),
    /// Namespaced keyword.
    Keyword(Keyword),
    /// Boolean.
    Boolean(bool),
    /// 64-bit float.
    Double(f64),
    /// Instant in time.
    Instant(DateTime<Utc>),
    /// UTF-8 text.
    Text(String),
    /// UUID.
    Uuid(Uuid),
}

// Doubles are compared and hashed by bit pattern, which gives a total
// equivalence (NaN == NaN, 0.0 != -0.0) suitable for index keys.
impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypedValue::Long(a), TypedValue::Long(b)) => a == b,
            (TypedValue::Ref(a), TypedValue::Ref(b)) => a == b,
            (TypedValue::Keyword(a), TypedValue::Keyword(b)) => a == b,
            (TypedValue::Boolean(a), TypedValue::Boolean(b)) => a == b,
            (TypedValue::Double(a), TypedValue::Double(b)) => a.to_bits() == b.to_bits(),
            (TypedValue::Instant(a), TypedValue::Instant(b)) => a == b,
            (TypedValue::Text(a), TypedValue::Text(b)) => a == b,
            (TypedValue::Uuid(a), TypedValue::Uuid(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypedValue {}

impl Hash for TypedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            TypedValue::Long(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            TypedValue::Ref(e) => {
                1u8.hash(state);
                e.hash(state);
            }
            TypedValue::Keyword(k) => {
                2u8.hash(state);
                k.hash(state);
            }
            TypedValue::Boolean(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            TypedValue::Double(d) => {
                4u8.hash(state);
                d.to_bits().hash(state);
            }
            TypedValue::Instant(t) => {
                5u8.hash(state);
                t.timestamp_millis().hash(state);
            }
            TypedValue::Text(s) => {
                6u8.hash(state);
                s.hash(state);
            }
            TypedValue::Uuid(u) => {
                7u8.hash(state);
                u.hash(state);
            }
        }
    }
}

impl TypedValue {
    /// Returns the kind of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::Long(_) => ValueType::Long,
            TypedValue::Ref(_) => ValueType::Ref,
            TypedValue::Keyword(_) => ValueType::Keyword,
            TypedValue::Boolean(_) => ValueType::Boolean,
            TypedValue::Double(_) => ValueType::Double,
            TypedValue::Instant(_) => ValueType::Instant,
            TypedValue::Text(_) => ValueType::Text,
            TypedValue::Uuid(_) => ValueType::Uuid,
        }
    }

    /// Creates an instant from milliseconds since the Unix epoch.
    ///
    /// Returns `None` if the value is outside chrono's representable range.
    pub fn instant_from_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(TypedValue::Instant)
    }

    /// Gets this value as a long, if it is one.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            TypedValue::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Gets this value as an entity reference, if it is one.
    pub fn as_entid(&self) -> Option<Entid> {
        match self {
            TypedValue::Ref(e) => Some(*e),
            _ => None,
        }
    }

    /// Gets this value as a keyword, if it is one.
    pub fn as_keyword(&self) -> Option<&Keyword> {
        match self {
            TypedValue::Keyword(k) => Some(k),
            _ => None,
        }
    }

    /// Gets this value as a boolean, if it is one.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Gets this value as a double, if it is one.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            TypedValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Gets this value as an instant, if it is one.
    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            TypedValue::Instant(t) => Some(*t),
            _ => None,
        }
    }

    /// Gets this value as text, if it is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Gets this value as a UUID, if it is one.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            TypedValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Consumes this value, returning owned text if it is text.
    pub fn into_text(self) -> Option<String> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Consumes this value, returning the keyword if it is one.
    pub fn into_keyword(self) -> Option<Keyword> {
        match self {
            TypedValue::Keyword(k) => Some(k),
            _ => None,
        }
    }
}

impl From<i64> for TypedValue {
    fn from(n: i64) -> Self {
        TypedValue::Long(n)
    }
}

impl From<i32> for TypedValue {
    fn from(n: i32) -> Self {
        TypedValue::Long(i64::from(n))
    }
}

impl From<Entid> for TypedValue {
    fn from(e: Entid) -> Self {
        TypedValue::Ref(e)
    }
}

impl From<Keyword> for TypedValue {
    fn from(k: Keyword) -> Self {
        TypedValue::Keyword(k)
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Boolean(b)
    }
}

impl From<f64> for TypedValue {
    fn from(d: f64) -> Self {
        TypedValue::Double(d)
    }
}

impl From<DateTime<Utc>> for TypedValue {
    fn from(t: DateTime<Utc>) -> Self {
        TypedValue::Instant(t)
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        TypedValue::Text(s)
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Text(s.to_string())
    }
}

impl From<Uuid> for TypedValue {
    fn from(u: Uuid) -> Self {
        TypedValue::Uuid(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_of_each_variant() {
        assert_eq!(TypedValue::Long(1).value_type(), ValueType::Long);
        assert_eq!(TypedValue::Ref(Entid::new(1)).value_type(), ValueType::Ref);
        assert_eq!(
            TypedValue::Keyword(Keyword::new("a", "b")).value_type(),
            ValueType::Keyword
        );
        assert_eq!(TypedValue::Boolean(true).value_type(), ValueType::Boolean);
        assert_eq!(TypedValue::Double(1.5).value_type(), ValueType::Double);
        assert_eq!(
            TypedValue::instant_from_millis(0).unwrap().value_type(),
            ValueType::Instant
        );
        assert_eq!(TypedValue::Text("x".into()).value_type(), ValueType::Text);
        assert_eq!(TypedValue::Uuid(Uuid::nil()).value_type(), ValueType::Uuid);
    }

    #[test]
    fn mismatched_accessor_returns_none() {
        let v = TypedValue::Long(42);
        assert_eq!(v.as_long(), Some(42));
        assert_eq!(v.as_text(), None);
        assert_eq!(v.as_boolean(), None);
        assert_eq!(v.as_entid(), None);
        assert_eq!(v.as_uuid(), None);
    }

    #[test]
    fn instant_from_millis_roundtrip() {
        let v = TypedValue::instant_from_millis(1_700_000_000_123).unwrap();
        assert_eq!(v.as_instant().unwrap().timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn double_hash_is_bitwise() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(TypedValue::Double(1.5));
        assert!(set.contains(&TypedValue::Double(1.5)));
        assert!(!set.contains(&TypedValue::Double(2.5)));
    }

    #[test]
    fn from_impls() {
        assert_eq!(TypedValue::from(7i64), TypedValue::Long(7));
        assert_eq!(TypedValue::from(7i32), TypedValue::Long(7));
        assert_eq!(TypedValue::from(true), TypedValue::Boolean(true));
        assert_eq!(TypedValue::from("hi"), TypedValue::Text("hi".to_string()));
        assert_eq!(
            TypedValue::from(Entid::new(3)),
            TypedValue::Ref(Entid::new(3))
        );
    }

    #[test]
    fn entid_display() {
        assert_eq!(Entid::new(42).to_string(), "entid:42");
    }
}
