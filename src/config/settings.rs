//! Configuration settings management
//!
//! Configuration is read from a TOML (or JSON) file and then overridden by
//! environment variables. Command-line flags are applied by the CLI.

use crate::client::{ClientOptions, DEFAULT_API_VERSION};
use crate::error::{KeyVaultClientError, Result};
use crate::identifier::normalize_vault;
use crate::utils::network::NetworkConfig;
use crate::utils::retry::RetryOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    /// Default vault, e.g. `https://myvault.vault.azure.net`
    pub vault_url: String,
    pub api_version: String,
    /// `default`, `clientsecret` or `static`
    pub credential_type: String,
    pub tenant_id: String,
    pub client_id: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_retries: usize,
    pub no_color: bool,
    /// Only send tokens for challenges within the vault's own domain
    pub verify_challenge_resource: bool,
    #[serde(skip)]
    pub client_secret: Option<Zeroizing<String>>,
    #[serde(skip)]
    pub access_token: Option<Zeroizing<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            vault_url: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            credential_type: "default".to_string(),
            tenant_id: String::new(),
            client_id: String::new(),
            connect_timeout_secs: 30,
            request_timeout_secs: 120,
            max_retries: 3,
            no_color: false,
            verify_challenge_resource: true,
            client_secret: None,
            access_token: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |secret: &Option<Zeroizing<String>>| secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("debug", &self.debug)
            .field("vault_url", &self.vault_url)
            .field("api_version", &self.api_version)
            .field("credential_type", &self.credential_type)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("no_color", &self.no_color)
            .field("verify_challenge_resource", &self.verify_challenge_resource)
            .field("client_secret", &redacted(&self.client_secret))
            .field("access_token", &redacted(&self.access_token))
            .finish()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_version.trim().is_empty() {
            return Err(KeyVaultClientError::config("api_version must not be empty"));
        }

        if !self.vault_url.is_empty() {
            normalize_vault(&self.vault_url)
                .map_err(|e| KeyVaultClientError::config(format!("Invalid vault_url: {}", e)))?;
        }

        match self.credential_type.to_lowercase().as_str() {
            "default" | "defaultazurecredential" => {}
            "clientsecret" => {
                if self.tenant_id.is_empty() || self.client_id.is_empty() {
                    return Err(KeyVaultClientError::config(
                        "tenant_id and client_id are required for client secret authentication",
                    ));
                }
            }
            "static" => {}
            other => {
                return Err(KeyVaultClientError::config(format!(
                    "Unsupported credential_type '{}'",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| KeyVaultClientError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("kvc").join("kvc.toml"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| {
                    KeyVaultClientError::config("Unable to determine config directory")
                })?;
            Ok(config_dir.join("kvc").join("kvc.toml"))
        }
    }

    /// Vault to use: explicit argument first, then the configured default
    pub fn resolve_vault_url(&self, vault_arg: Option<String>) -> Result<String> {
        if let Some(vault) = vault_arg {
            return normalize_vault(&vault);
        }

        if !self.vault_url.is_empty() {
            return normalize_vault(&self.vault_url);
        }

        Err(KeyVaultClientError::config(
            "No vault specified. Use --vault, set KVC_VAULT_URL, or configure vault_url",
        ))
    }

    /// Pipeline options derived from this configuration
    pub fn client_options(&self) -> ClientOptions {
        let network = NetworkConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..NetworkConfig::default()
        };
        let retry = RetryOptions {
            max_retries: self.max_retries,
            ..RetryOptions::default()
        };

        ClientOptions {
            api_version: self.api_version.clone(),
            network,
            retry,
            verify_challenge_resource: self.verify_challenge_resource,
        }
    }

    /// Settings handed to the credential factory
    pub fn auth_settings(&self) -> HashMap<String, String> {
        let mut settings = HashMap::new();
        if !self.tenant_id.is_empty() {
            settings.insert("tenant_id".to_string(), self.tenant_id.clone());
        }
        if !self.client_id.is_empty() {
            settings.insert("client_id".to_string(), self.client_id.clone());
        }
        if let Some(secret) = &self.client_secret {
            settings.insert("client_secret".to_string(), secret.to_string());
        }
        if let Some(token) = &self.access_token {
            settings.insert("token".to_string(), token.to_string());
        }
        settings
    }
}

/// Load configuration from multiple sources with priority order:
/// 1. Command-line flags (handled by clap)
/// 2. Environment variables
/// 3. Configuration file
/// 4. Default values
pub async fn load_config() -> Result<Config> {
    let config = load_config_no_validation().await?;
    config.validate()?;
    Ok(config)
}

/// Load configuration without validation (for config commands)
pub async fn load_config_no_validation() -> Result<Config> {
    let config_path = Config::get_config_path()?;
    let mut config = if config_path.exists() {
        load_from_file(&config_path).await?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub async fn load_from_file(path: &Path) -> Result<Config> {
    debug!("Loading configuration from {}", path.display());
    let contents = tokio::fs::read_to_string(path).await?;

    // TOML first, JSON as fallback
    match toml::from_str::<Config>(&contents) {
        Ok(config) => Ok(config),
        Err(toml_error) => serde_json::from_str::<Config>(&contents).map_err(|_| toml_error.into()),
    }
}

/// Apply environment overrides using `lookup` to read variables
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("KVC_DEBUG") {
        config.debug = value.to_lowercase() == "true" || value == "1";
    }

    if let Some(value) = lookup("KVC_VAULT_URL") {
        config.vault_url = value;
    }

    if let Some(value) = lookup("KVC_API_VERSION") {
        config.api_version = value;
    }

    if let Some(value) = lookup("KVC_CREDENTIAL_TYPE") {
        config.credential_type = value;
    }

    if let Some(value) = lookup("AZURE_TENANT_ID") {
        config.tenant_id = value;
    }

    if let Some(value) = lookup("AZURE_CLIENT_ID") {
        config.client_id = value;
    }

    if let Some(value) = lookup("AZURE_CLIENT_SECRET") {
        config.client_secret = Some(Zeroizing::new(value));
    }

    if let Some(value) = lookup("KVC_ACCESS_TOKEN") {
        config.access_token = Some(Zeroizing::new(value));
    }

    if let Some(value) = lookup("KVC_MAX_RETRIES") {
        if let Ok(retries) = value.parse::<usize>() {
            config.max_retries = retries;
        }
    }

    if let Some(value) = lookup("KVC_REQUEST_TIMEOUT") {
        if let Ok(seconds) = value.parse::<u64>() {
            config.request_timeout_secs = seconds;
        }
    }
}

pub async fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| KeyVaultClientError::serialization(e.to_string()))?;

    tokio::fs::write(path, contents).await?;
    Ok(())
}

pub async fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &Config::get_config_path()?).await
}

/// Write a default configuration unless one already exists
pub async fn init_default_config() -> Result<PathBuf> {
    let config_path = Config::get_config_path()?;

    if !config_path.exists() {
        save_config_to(&Config::default(), &config_path).await?;
    }

    Ok(config_path)
}
