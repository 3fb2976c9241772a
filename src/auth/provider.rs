//! Authentication provider trait and implementations
//!
//! A vault client needs one thing from a credential: a bearer token for the
//! scope named by the vault's authentication challenge. Generic Azure
//! credentials are adapted to that requirement here, once, when the client
//! is constructed.

use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{ClientSecretCredential, DefaultAzureCredential, TokenCredentialOptions};
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use zeroize::Zeroizing;

use crate::error::{KeyVaultClientError, Result};

#[cfg(test)]
use mockall::automock;

/// Scope used when talking to the public-cloud vault resource
pub const DEFAULT_VAULT_SCOPE: &str = "https://vault.azure.net/.default";

const AZURE_PUBLIC_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Trait for credentials able to sign vault requests
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VaultAuthProvider: Send + Sync {
    /// Get an access token for a single scope
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;

    /// Drop any tokens cached by the underlying credential
    async fn clear_cache(&self) -> Result<()>;

    /// Short name used in logs
    fn kind(&self) -> &'static str;
}

/// Adapter over any `azure_core` token credential
pub struct TokenCredentialProvider {
    credential: Arc<dyn TokenCredential>,
    kind: &'static str,
}

impl TokenCredentialProvider {
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            credential,
            kind: "token-credential",
        }
    }

    /// Provider backed by DefaultAzureCredential
    pub fn default_azure() -> Result<Self> {
        let credential = DefaultAzureCredential::create(TokenCredentialOptions::default())
            .map_err(|e| {
                KeyVaultClientError::authentication(format!(
                    "Failed to create DefaultAzureCredential: {}",
                    e
                ))
            })?;

        Ok(Self {
            credential: Arc::new(credential),
            kind: "default",
        })
    }

    /// Provider backed by a service principal secret
    pub fn client_secret(
        tenant_id: String,
        client_id: String,
        client_secret: String,
    ) -> Result<Self> {
        let authority_host = url::Url::parse(AZURE_PUBLIC_AUTHORITY)
            .map_err(|e| KeyVaultClientError::config(format!("Invalid authority URL: {}", e)))?;

        let credential = ClientSecretCredential::new(
            azure_core::new_http_client(),
            authority_host,
            tenant_id,
            client_id,
            client_secret,
        );

        Ok(Self {
            credential: Arc::new(credential),
            kind: "clientsecret",
        })
    }
}

#[async_trait]
impl VaultAuthProvider for TokenCredentialProvider {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        self.credential
            .get_token(&[scope])
            .await
            .map_err(|e| KeyVaultClientError::authentication(format!("Failed to get token: {}", e)))
    }

    async fn clear_cache(&self) -> Result<()> {
        self.credential
            .clear_cache()
            .await
            .map_err(|e| {
                KeyVaultClientError::authentication(format!("Failed to clear token cache: {}", e))
            })
    }

    fn kind(&self) -> &'static str {
        self.kind
    }
}

/// A bearer token supplied by the caller, used for every scope
pub struct StaticTokenProvider {
    token: Zeroizing<String>,
    expires_on: OffsetDateTime,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_expiry(token, OffsetDateTime::now_utc() + time::Duration::hours(1))
    }

    pub fn with_expiry(token: impl Into<String>, expires_on: OffsetDateTime) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            expires_on,
        }
    }
}

#[async_trait]
impl VaultAuthProvider for StaticTokenProvider {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        if self.token.is_empty() {
            return Err(KeyVaultClientError::authentication("Static token is empty"));
        }
        Ok(AccessToken::new(self.token.to_string(), self.expires_on))
    }

    async fn clear_cache(&self) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "static"
    }
}

/// Authentication provider factory
pub struct AuthProviderFactory;

impl AuthProviderFactory {
    /// Create an authentication provider based on configuration
    pub fn create_provider(
        provider_type: &str,
        config: &HashMap<String, String>,
    ) -> Result<Arc<dyn VaultAuthProvider>> {
        match provider_type.to_lowercase().as_str() {
            "default" | "defaultazurecredential" => {
                Ok(Arc::new(TokenCredentialProvider::default_azure()?))
            }
            "clientsecret" => {
                let tenant_id = config.get("tenant_id").ok_or_else(|| {
                    KeyVaultClientError::config(
                        "tenant_id is required for client secret authentication",
                    )
                })?;
                let client_id = config.get("client_id").ok_or_else(|| {
                    KeyVaultClientError::config(
                        "client_id is required for client secret authentication",
                    )
                })?;
                let client_secret = config.get("client_secret").ok_or_else(|| {
                    KeyVaultClientError::config(
                        "client_secret is required for client secret authentication",
                    )
                })?;

                Ok(Arc::new(TokenCredentialProvider::client_secret(
                    tenant_id.clone(),
                    client_id.clone(),
                    client_secret.clone(),
                )?))
            }
            "static" => {
                let token = config.get("token").ok_or_else(|| {
                    KeyVaultClientError::config("token is required for static token authentication")
                })?;
                Ok(Arc::new(StaticTokenProvider::new(token.clone())))
            }
            _ => Err(KeyVaultClientError::config(format!(
                "Unsupported authentication provider: {}",
                provider_type
            ))),
        }
    }
}
