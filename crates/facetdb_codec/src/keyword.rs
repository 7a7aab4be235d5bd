//! Namespaced keywords.

use crate::error::{CodecError, CodecResult};
use std::fmt;
use std::str::FromStr;

/// A namespaced keyword such as `:todo/name`.
///
/// Keywords are the only addressing scheme for entity attributes. The
/// printed form is always `:namespace/name`; both components must be
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keyword {
    namespace: String,
    name: String,
}

impl Keyword {
    /// Creates a keyword from its components.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parses a keyword from its printed `:namespace/name` form.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedKeyword`] if the leading colon is
    /// missing, there is no `/` separator, or either component is empty.
    pub fn parse(text: &str) -> CodecResult<Self> {
        let body = text
            .strip_prefix(':')
            .ok_or_else(|| CodecError::malformed_keyword(text))?;
        let (namespace, name) = body
            .split_once('/')
            .ok_or_else(|| CodecError::malformed_keyword(text))?;
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(CodecError::malformed_keyword(text));
        }
        Ok(Self::new(namespace, name))
    }

    /// Returns the namespace component.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the name component.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}/{}", self.namespace, self.name)
    }
}

impl FromStr for Keyword {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let kw = Keyword::parse(":todo/due_date").unwrap();
        assert_eq!(kw.namespace(), "todo");
        assert_eq!(kw.name(), "due_date");
        assert_eq!(kw.to_string(), ":todo/due_date");
    }

    #[test]
    fn parse_rejects_missing_colon() {
        assert!(Keyword::parse("todo/name").is_err());
    }

    #[test]
    fn parse_rejects_missing_separator() {
        assert!(Keyword::parse(":todoname").is_err());
    }

    #[test]
    fn parse_rejects_empty_components() {
        assert!(Keyword::parse(":/name").is_err());
        assert!(Keyword::parse(":todo/").is_err());
        assert!(Keyword::parse(":").is_err());
    }

    #[test]
    fn parse_rejects_extra_separator() {
        assert!(Keyword::parse(":a/b/c").is_err());
    }

    #[test]
    fn from_str_impl() {
        let kw: Keyword = ":label/color".parse().unwrap();
        assert_eq!(kw, Keyword::new("label", "color"));
    }
}
