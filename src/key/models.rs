//! Key models and data structures

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::client::models::Attributes;
use crate::error::{KeyVaultClientError, Result};

/// JSON Web Key type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsonWebKeyType {
    #[serde(rename = "EC")]
    Ec,
    #[serde(rename = "EC-HSM")]
    EcHsm,
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "RSA-HSM")]
    RsaHsm,
    #[serde(rename = "oct")]
    Oct,
    #[serde(rename = "oct-HSM")]
    OctHsm,
}

impl JsonWebKeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ec => "EC",
            Self::EcHsm => "EC-HSM",
            Self::Rsa => "RSA",
            Self::RsaHsm => "RSA-HSM",
            Self::Oct => "oct",
            Self::OctHsm => "oct-HSM",
        }
    }
}

impl std::str::FromStr for JsonWebKeyType {
    type Err = KeyVaultClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "EC" => Ok(Self::Ec),
            "EC-HSM" => Ok(Self::EcHsm),
            "RSA" => Ok(Self::Rsa),
            "RSA-HSM" => Ok(Self::RsaHsm),
            "oct" => Ok(Self::Oct),
            "oct-HSM" => Ok(Self::OctHsm),
            other => Err(KeyVaultClientError::invalid_argument(format!(
                "Unknown key type '{}'",
                other
            ))),
        }
    }
}

/// Public part of a key as a JSON Web Key; binary members are base64url
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonWebKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<JsonWebKeyType>,
    #[serde(default, rename = "key_ops", skip_serializing_if = "Vec::is_empty")]
    pub key_ops: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl JsonWebKey {
    /// Decoded RSA modulus
    pub fn modulus(&self) -> Result<Option<Vec<u8>>> {
        self.n.as_deref().map(decode_member).transpose()
    }

    /// Decoded RSA public exponent
    pub fn exponent(&self) -> Result<Option<Vec<u8>>> {
        self.e.as_deref().map(decode_member).transpose()
    }

    /// Modulus size in bits for RSA keys
    pub fn rsa_key_size(&self) -> Result<Option<usize>> {
        Ok(self.modulus()?.map(|n| {
            let leading_zeros = n.iter().take_while(|b| **b == 0).count();
            (n.len() - leading_zeros) * 8
        }))
    }
}

fn decode_member(value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| {
            KeyVaultClientError::serialization(format!("Invalid base64url key member: {}", e))
        })
}

/// A key with its public material
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBundle {
    #[serde(default)]
    pub key: JsonWebKey,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub managed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedKeyBundle {
    #[serde(flatten)]
    pub key: KeyBundle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_id: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_purge_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_date: Option<DateTime<Utc>>,
}

/// A key in a list result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyItem {
    pub kid: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub managed: bool,
}

/// Body of a create-key request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCreateParameters {
    pub kty: JsonWebKeyType,
    #[serde(default, rename = "key_size", skip_serializing_if = "Option::is_none")]
    pub key_size: Option<u32>,
    #[serde(default, rename = "key_ops", skip_serializing_if = "Vec::is_empty")]
    pub key_ops: Vec<String>,
    #[serde(default, rename = "attributes", skip_serializing_if = "Option::is_none")]
    pub key_attributes: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
}

impl KeyCreateParameters {
    pub fn new(kty: JsonWebKeyType) -> Self {
        Self {
            kty,
            key_size: None,
            key_ops: Vec::new(),
            key_attributes: None,
            tags: None,
            crv: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_bundle_from_wire() {
        let bundle: KeyBundle = serde_json::from_value(json!({
            "key": {
                "kid": "https://v.vault.azure.net/keys/k/1",
                "kty": "RSA-HSM",
                "key_ops": ["sign", "verify"],
                "n": "AQAB",
                "e": "AQAB"
            },
            "attributes": { "enabled": true }
        }))
        .unwrap();

        assert_eq!(bundle.key.kty, Some(JsonWebKeyType::RsaHsm));
        assert_eq!(bundle.key.key_ops, vec!["sign", "verify"]);
        assert_eq!(bundle.key.exponent().unwrap(), Some(vec![1, 0, 1]));
        assert_eq!(bundle.key.rsa_key_size().unwrap(), Some(24));
    }

    #[test]
    fn test_create_parameters_wire_names() {
        let mut params = KeyCreateParameters::new(JsonWebKeyType::Rsa);
        params.key_size = Some(2048);
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value, json!({ "kty": "RSA", "key_size": 2048 }));
    }

    #[test]
    fn test_key_type_from_str() {
        assert_eq!("EC".parse::<JsonWebKeyType>().unwrap(), JsonWebKeyType::Ec);
        assert!("DSA".parse::<JsonWebKeyType>().is_err());
    }
}
