//! # FacetDB Testkit
//!
//! Shared test fixtures and property-based generators for the FacetDB
//! workspace. Downstream crates pull this in as a dev-dependency; it is
//! never part of a shipping build.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
