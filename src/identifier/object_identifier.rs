//! Key Vault object identifiers
//!
//! Identifiers have the shape `{vault}/{collection}/{name}[/{version}]`,
//! where `vault` is `scheme://host[:port]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::{KeyVaultClientError, Result};

/// Version segment used by certificate operation identifiers
pub const PENDING_VERSION: &str = "pending";

/// Sub-collections living under `certificates/` that are never certificate names
const RESERVED_CERTIFICATE_NAMES: [&str; 2] = ["issuers", "contacts"];

/// Collections addressable by an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collection {
    Keys,
    Secrets,
    Certificates,
    Issuers,
}

impl Collection {
    /// Path segments of the collection inside the vault
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Keys => "keys",
            Collection::Secrets => "secrets",
            Collection::Certificates => "certificates",
            Collection::Issuers => "certificates/issuers",
        }
    }

    fn segments(&self) -> Vec<&'static str> {
        self.path().split('/').collect()
    }

    fn allows_version(&self) -> bool {
        !matches!(self, Collection::Issuers)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A parsed or constructed Key Vault object identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectIdentifier {
    pub collection: Collection,
    pub vault: String,
    pub name: String,
    pub version: Option<String>,
    pub base_identifier: String,
    pub identifier: String,
}

impl ObjectIdentifier {
    /// Build an identifier from its parts
    pub fn new(
        collection: Collection,
        vault: &str,
        name: &str,
        version: Option<&str>,
    ) -> Result<Self> {
        let vault = normalize_vault(vault)?;

        if name.trim().is_empty() {
            return Err(KeyVaultClientError::invalid_argument("name must not be empty"));
        }
        if name.contains('/') {
            return Err(KeyVaultClientError::invalid_argument(format!(
                "name '{}' must not contain '/'",
                name
            )));
        }

        if collection == Collection::Certificates
            && RESERVED_CERTIFICATE_NAMES.contains(&name.to_ascii_lowercase().as_str())
        {
            return Err(KeyVaultClientError::invalid_argument(format!(
                "'{}' is a reserved name under certificates/",
                name
            )));
        }

        let version = version.filter(|v| !v.is_empty()).map(str::to_string);
        if version.is_some() && !collection.allows_version() {
            return Err(KeyVaultClientError::invalid_argument(format!(
                "{} identifiers do not carry a version",
                collection
            )));
        }

        let base_identifier = format!("{}/{}/{}", vault, collection.path(), name);
        let identifier = match &version {
            Some(v) => format!("{}/{}", base_identifier, v),
            None => base_identifier.clone(),
        };

        Ok(Self {
            collection,
            vault,
            name: name.to_string(),
            version,
            base_identifier,
            identifier,
        })
    }

    /// Parse an identifier that must belong to `collection`
    pub fn parse(collection: Collection, identifier: &str) -> Result<Self> {
        let url = Url::parse(identifier)
            .map_err(|e| KeyVaultClientError::invalid_identifier(identifier, e.to_string()))?;

        let host = url
            .host_str()
            .ok_or_else(|| KeyVaultClientError::invalid_identifier(identifier, "missing host"))?;
        let vault = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        let segments: Vec<&str> = url
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let expected = collection.segments();
        let max_segments = expected.len() + if collection.allows_version() { 2 } else { 1 };
        if segments.len() <= expected.len() || segments.len() > max_segments {
            return Err(KeyVaultClientError::invalid_identifier(
                identifier,
                "bad number of segments",
            ));
        }

        if segments[..expected.len()] != expected[..] {
            return Err(KeyVaultClientError::invalid_identifier(
                identifier,
                format!("collection '{}' expected", collection),
            ));
        }

        let name = segments[expected.len()];
        if collection == Collection::Certificates
            && RESERVED_CERTIFICATE_NAMES.contains(&name.to_ascii_lowercase().as_str())
        {
            return Err(KeyVaultClientError::invalid_identifier(
                identifier,
                format!("collection '{}' expected, found 'certificates/{}'", collection, name),
            ));
        }
        let version = segments.get(expected.len() + 1).copied();

        Self::new(collection, &vault, name, version)
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

/// Validate a vault base URL and strip a trailing slash
pub fn normalize_vault(vault: &str) -> Result<String> {
    let trimmed = vault.trim();
    if trimmed.is_empty() {
        return Err(KeyVaultClientError::invalid_argument("vault must not be empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| {
        KeyVaultClientError::invalid_argument(format!(
            "vault '{}' is not an absolute URL: {}",
            trimmed, e
        ))
    })?;
    if url.host_str().is_none() {
        return Err(KeyVaultClientError::invalid_argument(format!(
            "vault '{}' has no host",
            trimmed
        )));
    }

    Ok(trimmed.strip_suffix('/').unwrap_or(trimmed).to_string())
}

pub fn create_key_identifier(vault: &str, name: &str, version: &str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::new(Collection::Keys, vault, name, Some(version))
}

pub fn parse_key_identifier(identifier: &str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::parse(Collection::Keys, identifier)
}

pub fn create_secret_identifier(
    vault: &str,
    name: &str,
    version: &str,
) -> Result<ObjectIdentifier> {
    ObjectIdentifier::new(Collection::Secrets, vault, name, Some(version))
}

pub fn parse_secret_identifier(identifier: &str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::parse(Collection::Secrets, identifier)
}

pub fn create_certificate_identifier(
    vault: &str,
    name: &str,
    version: &str,
) -> Result<ObjectIdentifier> {
    ObjectIdentifier::new(Collection::Certificates, vault, name, Some(version))
}

pub fn parse_certificate_identifier(identifier: &str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::parse(Collection::Certificates, identifier)
}

/// `{vault}/certificates/{name}/pending`
pub fn create_certificate_operation_identifier(
    vault: &str,
    name: &str,
) -> Result<ObjectIdentifier> {
    ObjectIdentifier::new(Collection::Certificates, vault, name, Some(PENDING_VERSION))
}

pub fn parse_certificate_operation_identifier(identifier: &str) -> Result<ObjectIdentifier> {
    let parsed = ObjectIdentifier::parse(Collection::Certificates, identifier)?;
    if parsed.version.as_deref() != Some(PENDING_VERSION) {
        return Err(KeyVaultClientError::invalid_identifier(
            identifier,
            "certificate operation identifiers must end with 'pending'",
        ));
    }
    Ok(parsed)
}

pub fn create_issuer_identifier(vault: &str, name: &str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::new(Collection::Issuers, vault, name, None)
}

pub fn parse_issuer_identifier(identifier: &str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::parse(Collection::Issuers, identifier)
}
