//! Key Vault client
//!
//! `KeyVaultClient` owns the HTTP client, the signing stage and the retry
//! policy. Typed operations for secrets, keys and certificates are provided
//! by the traits in the `secret`, `key` and `certificate` modules.

pub mod models;
pub mod pipeline;

pub use models::*;
pub use pipeline::*;

use std::sync::Arc;

use crate::auth::{ChallengeAuthorizer, VaultAuthProvider};
use crate::error::Result;
use crate::utils::network::{create_http_client, NetworkConfig};
use crate::utils::retry::RetryOptions;

pub const DEFAULT_API_VERSION: &str = "7.4";

/// Options for the request pipeline
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_version: String,
    pub network: NetworkConfig,
    pub retry: RetryOptions,
    /// Reject challenges whose resource is outside the vault's domain
    pub verify_challenge_resource: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            network: NetworkConfig::default(),
            retry: RetryOptions::default(),
            verify_challenge_resource: true,
        }
    }
}

/// Client for the Key Vault data-plane REST API
pub struct KeyVaultClient {
    pub(crate) http: reqwest::Client,
    pub(crate) authorizer: ChallengeAuthorizer,
    pub(crate) options: ClientOptions,
}

impl KeyVaultClient {
    pub fn new(credential: Arc<dyn VaultAuthProvider>, options: ClientOptions) -> Result<Self> {
        let http = create_http_client(&options.network)?;
        Ok(Self {
            http,
            authorizer: ChallengeAuthorizer::new(credential)
                .with_resource_verification(options.verify_challenge_resource),
            options,
        })
    }

    pub fn api_version(&self) -> &str {
        &self.options.api_version
    }

    pub fn authorizer(&self) -> &ChallengeAuthorizer {
        &self.authorizer
    }
}
