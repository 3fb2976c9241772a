//! Authentication module for Key Vault requests
//!
//! Credential adapters and the bearer-challenge signing stage used by the
//! request pipeline.

pub mod challenge;
pub mod provider;

pub use challenge::*;
pub use provider::*;
