//! # FacetDB Codec
//!
//! The typed value model and its tagged binary codec.
//!
//! This crate provides:
//! - [`TypedValue`] - an exhaustive sum type over the eight value kinds
//!   FacetDB stores (long, ref, keyword, boolean, double, instant, text,
//!   UUID)
//! - [`Keyword`] - namespaced attribute keywords (`:todo/name`)
//! - [`Entid`] - opaque entity identifiers
//! - A deterministic tagged binary encoding used by the transaction log
//!   and the sync protocol
//!
//! ## Usage
//!
//! ```
//! use facetdb_codec::{decode_value, encode_value, TypedValue};
//!
//! let value = TypedValue::Long(42);
//! let bytes = encode_value(&value);
//! let decoded = decode_value(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod keyword;
mod value;

pub use decoder::{decode_value, ValueDecoder};
pub use encoder::{encode_value, ValueEncoder};
pub use error::{CodecError, CodecResult};
pub use keyword::Keyword;
pub use value::{Entid, TypedValue, ValueType};
