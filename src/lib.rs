//! keyvault-client - Azure Key Vault REST client
//!
//! Typed async operations for certificates, keys, secrets and issuers,
//! bearer-challenge authentication over `azure_core` credentials, and
//! identifier parsing for the `{vault}/{collection}/{name}/{version}`
//! convention.

pub mod auth;
pub mod certificate;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod identifier;
pub mod key;
pub mod secret;
pub mod utils;

// Re-export commonly used types
pub use auth::{
    AuthProviderFactory, StaticTokenProvider, TokenCredentialProvider, VaultAuthProvider,
};
pub use certificate::CertificateOperations;
pub use client::{ClientOptions, KeyVaultClient};
pub use error::{KeyVaultClientError, Result};
pub use key::KeyOperations;
pub use secret::SecretOperations;
