//! Secret operations against the vault REST API

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use crate::client::pipeline::{validate_object_name, with_max_results};
use crate::client::KeyVaultClient;
use crate::error::Result;
use crate::secret::models::{
    DeletedSecretBundle, SecretBundle, SecretItem, SecretSetParameters, SecretUpdateParameters,
};

/// Trait for secret operations
#[async_trait]
pub trait SecretOperations: Send + Sync {
    /// Create a secret or add a new version of it
    async fn set_secret(
        &self,
        vault_base_url: &str,
        secret_name: &str,
        parameters: &SecretSetParameters,
    ) -> Result<SecretBundle>;

    /// Get a secret; an empty version means the latest
    async fn get_secret(
        &self,
        vault_base_url: &str,
        secret_name: &str,
        secret_version: &str,
    ) -> Result<SecretBundle>;

    /// Update the attributes, tags or content type of one secret version
    async fn update_secret(
        &self,
        vault_base_url: &str,
        secret_name: &str,
        secret_version: &str,
        parameters: &SecretUpdateParameters,
    ) -> Result<SecretBundle>;

    /// Delete all versions of a secret
    async fn delete_secret(
        &self,
        vault_base_url: &str,
        secret_name: &str,
    ) -> Result<DeletedSecretBundle>;

    /// List secrets in a vault
    async fn get_secrets(
        &self,
        vault_base_url: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<SecretItem>>;

    /// List the versions of a secret
    async fn get_secret_versions(
        &self,
        vault_base_url: &str,
        secret_name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<SecretItem>>;
}

fn secret_path(secret_name: &str, secret_version: &str) -> Result<String> {
    validate_object_name("secret name", secret_name)?;
    if secret_version.is_empty() {
        return Ok(format!("secrets/{}", secret_name));
    }
    validate_object_name("secret version", secret_version)?;
    Ok(format!("secrets/{}/{}", secret_name, secret_version))
}

#[async_trait]
impl SecretOperations for KeyVaultClient {
    #[instrument(skip(self, parameters))]
    async fn set_secret(
        &self,
        vault_base_url: &str,
        secret_name: &str,
        parameters: &SecretSetParameters,
    ) -> Result<SecretBundle> {
        let url = self.request_url(vault_base_url, &secret_path(secret_name, "")?)?;
        self.send_json(Method::PUT, url, parameters, &[200]).await
    }

    #[instrument(skip(self))]
    async fn get_secret(
        &self,
        vault_base_url: &str,
        secret_name: &str,
        secret_version: &str,
    ) -> Result<SecretBundle> {
        let url = self.request_url(vault_base_url, &secret_path(secret_name, secret_version)?)?;
        self.get_json(url).await
    }

    #[instrument(skip(self, parameters))]
    async fn update_secret(
        &self,
        vault_base_url: &str,
        secret_name: &str,
        secret_version: &str,
        parameters: &SecretUpdateParameters,
    ) -> Result<SecretBundle> {
        let url = self.request_url(vault_base_url, &secret_path(secret_name, secret_version)?)?;
        self.send_json(Method::PATCH, url, parameters, &[200]).await
    }

    #[instrument(skip(self))]
    async fn delete_secret(
        &self,
        vault_base_url: &str,
        secret_name: &str,
    ) -> Result<DeletedSecretBundle> {
        let url = self.request_url(vault_base_url, &secret_path(secret_name, "")?)?;
        self.delete_json(url).await
    }

    #[instrument(skip(self))]
    async fn get_secrets(
        &self,
        vault_base_url: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<SecretItem>> {
        let url = self.request_url(vault_base_url, "secrets")?;
        self.list_all(with_max_results(url, max_results)).await
    }

    #[instrument(skip(self))]
    async fn get_secret_versions(
        &self,
        vault_base_url: &str,
        secret_name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<SecretItem>> {
        validate_object_name("secret name", secret_name)?;
        let url = self.request_url(vault_base_url, &format!("secrets/{}/versions", secret_name))?;
        self.list_all(with_max_results(url, max_results)).await
    }
}
