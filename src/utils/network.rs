use crate::error::{KeyVaultClientError, Result};
use reqwest::Client;
use std::time::Duration;

/// Statuses the vault uses for transient failures
pub const TRANSIENT_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Configuration for HTTP client timeouts and identification
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            user_agent: format!("keyvault-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| KeyVaultClientError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a transport failure into an error that names the vault involved
pub fn classify_network_error(error: &reqwest::Error, url: &str) -> KeyVaultClientError {
    let vault_name = extract_vault_name_from_url(url);

    if error.is_timeout() {
        return KeyVaultClientError::connection_timeout(vault_name);
    }

    if error.is_connect() {
        if is_dns_resolution_error(error) {
            return KeyVaultClientError::network(format!(
                "Unable to resolve vault hostname '{}'. Check the vault URL.",
                vault_name
            ));
        }

        return KeyVaultClientError::network(format!(
            "Failed to connect to vault '{}': {}",
            vault_name, error
        ));
    }

    KeyVaultClientError::network(format!(
        "Network error when accessing vault '{}': {}",
        vault_name, error
    ))
}

fn is_dns_resolution_error(error: &reqwest::Error) -> bool {
    let error_msg = error.to_string().to_lowercase();
    let dns_indicators = [
        "dns",
        "name resolution",
        "name or service not known",
        "nodename nor servname provided",
        "no such host",
        "could not resolve host",
    ];

    dns_indicators
        .iter()
        .any(|&indicator| error_msg.contains(indicator))
}

/// Extract vault name from a Key Vault URL
pub fn extract_vault_name_from_url(url: &str) -> String {
    if let Ok(parsed_url) = url::Url::parse(url) {
        if let Some(host) = parsed_url.host_str() {
            return match host.split_once(".vault.") {
                Some((vault, _)) => vault.to_string(),
                None => host.to_string(),
            };
        }
    }

    "unknown-vault".to_string()
}

/// Check if an error is worth retrying
pub fn is_retryable_error(error: &KeyVaultClientError) -> bool {
    match error {
        KeyVaultClientError::ConnectionTimeout(_) => true,
        KeyVaultClientError::NetworkError(msg) => {
            // Resolution failures do not heal on their own
            !msg.contains("Unable to resolve")
        }
        KeyVaultClientError::Service { status, .. }
        | KeyVaultClientError::UnparsedErrorBody { status, .. } => {
            TRANSIENT_STATUS_CODES.contains(status)
        }
        _ => false,
    }
}
