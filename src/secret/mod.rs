//! Secret management module
//!
//! Typed secret operations for the vault REST API.

pub mod models;
pub mod operations;

pub use models::*;
pub use operations::*;
