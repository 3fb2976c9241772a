use thiserror::Error;

/// Main error type for keyvault-client operations
#[derive(Debug, Error)]
pub enum KeyVaultClientError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The vault answered with an error envelope we could read
    #[error("Key Vault returned HTTP {status} for {method} {url}: {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
        method: String,
        url: String,
        body: String,
        retry_after: Option<u64>,
    },

    /// The vault answered with a non-success status and a body that is not an error envelope
    #[error("Key Vault returned HTTP {status} for {method} {url} and the error body could not be deserialized: {reason}")]
    UnparsedErrorBody {
        status: u16,
        method: String,
        url: String,
        body: String,
        reason: String,
        retry_after: Option<u64>,
    },

    #[error("Not found: {message}")]
    NotFound { url: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection to '{0}' timed out")]
    ConnectionTimeout(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl KeyVaultClientError {
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_identifier<S: Into<String>, R: Into<String>>(identifier: S, reason: R) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn connection_timeout<S: Into<String>>(target: S) -> Self {
        Self::ConnectionTimeout(target.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unknown<S: Into<String>>(msg: S) -> Self {
        Self::Unknown(msg.into())
    }

    /// HTTP status code attached to a service-side failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } | Self::UnparsedErrorBody { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Service error code from the error envelope, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Seconds the service asked us to wait before retrying
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Service { retry_after, .. } | Self::UnparsedErrorBody { retry_after, .. } => {
                *retry_after
            }
            _ => None,
        }
    }
}

/// Result type alias for keyvault-client operations
pub type Result<T> = std::result::Result<T, KeyVaultClientError>;

/// Convert Azure Core errors to KeyVaultClientError
impl From<azure_core::Error> for KeyVaultClientError {
    fn from(error: azure_core::Error) -> Self {
        Self::AuthenticationError(error.to_string())
    }
}
