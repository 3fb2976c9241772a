//! Certificate management module
//!
//! Certificate, certificate operation and issuer calls, including the
//! pending signing request fetch used for externally signed certificates.

pub mod models;
pub mod operations;

pub use models::*;
pub use operations::*;
