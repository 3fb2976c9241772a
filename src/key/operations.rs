//! Key operations against the vault REST API

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use crate::client::pipeline::{validate_object_name, with_max_results};
use crate::client::KeyVaultClient;
use crate::error::Result;
use crate::key::models::{DeletedKeyBundle, KeyBundle, KeyCreateParameters, KeyItem};

/// Trait for key operations
#[async_trait]
pub trait KeyOperations: Send + Sync {
    /// Create a key or a new version of it
    async fn create_key(
        &self,
        vault_base_url: &str,
        key_name: &str,
        parameters: &KeyCreateParameters,
    ) -> Result<KeyBundle>;

    /// Get the public part of a key; an empty version means the latest
    async fn get_key(
        &self,
        vault_base_url: &str,
        key_name: &str,
        key_version: &str,
    ) -> Result<KeyBundle>;

    /// Delete all versions of a key
    async fn delete_key(&self, vault_base_url: &str, key_name: &str) -> Result<DeletedKeyBundle>;

    /// List keys in a vault
    async fn get_keys(&self, vault_base_url: &str, max_results: Option<u32>)
        -> Result<Vec<KeyItem>>;

    /// List the versions of a key
    async fn get_key_versions(
        &self,
        vault_base_url: &str,
        key_name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<KeyItem>>;
}

#[async_trait]
impl KeyOperations for KeyVaultClient {
    #[instrument(skip(self, parameters))]
    async fn create_key(
        &self,
        vault_base_url: &str,
        key_name: &str,
        parameters: &KeyCreateParameters,
    ) -> Result<KeyBundle> {
        validate_object_name("key name", key_name)?;
        let url = self.request_url(vault_base_url, &format!("keys/{}/create", key_name))?;
        self.send_json(Method::POST, url, parameters, &[200]).await
    }

    #[instrument(skip(self))]
    async fn get_key(
        &self,
        vault_base_url: &str,
        key_name: &str,
        key_version: &str,
    ) -> Result<KeyBundle> {
        validate_object_name("key name", key_name)?;
        let path = if key_version.is_empty() {
            format!("keys/{}", key_name)
        } else {
            validate_object_name("key version", key_version)?;
            format!("keys/{}/{}", key_name, key_version)
        };
        let url = self.request_url(vault_base_url, &path)?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn delete_key(&self, vault_base_url: &str, key_name: &str) -> Result<DeletedKeyBundle> {
        validate_object_name("key name", key_name)?;
        let url = self.request_url(vault_base_url, &format!("keys/{}", key_name))?;
        self.delete_json(url).await
    }

    #[instrument(skip(self))]
    async fn get_keys(
        &self,
        vault_base_url: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<KeyItem>> {
        let url = self.request_url(vault_base_url, "keys")?;
        self.list_all(with_max_results(url, max_results)).await
    }

    #[instrument(skip(self))]
    async fn get_key_versions(
        &self,
        vault_base_url: &str,
        key_name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<KeyItem>> {
        validate_object_name("key name", key_name)?;
        let url = self.request_url(vault_base_url, &format!("keys/{}/versions", key_name))?;
        self.list_all(with_max_results(url, max_results)).await
    }
}
