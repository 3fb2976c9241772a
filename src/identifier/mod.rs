//! Identifier module
//!
//! Builds and parses key, secret, certificate, certificate operation and
//! issuer identifiers against the `{vault}/{collection}/{name}/{version}`
//! convention.

pub mod object_identifier;

pub use object_identifier::*;
