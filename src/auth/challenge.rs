//! Bearer challenge handling
//!
//! The vault answers an unauthenticated request with
//! `401` and `WWW-Authenticate: Bearer authorization="...", resource="..."`.
//! The challenge tells us which scope to request a token for. Challenges are
//! cached per vault authority and tokens per scope.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::auth::provider::VaultAuthProvider;
use crate::error::{KeyVaultClientError, Result};

/// Tokens closer than this to expiry are refreshed before use
const TOKEN_REFRESH_MARGIN: time::Duration = time::Duration::minutes(5);

fn challenge_param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_]+)\s*=\s*"([^"]*)""#).expect("static challenge regex is valid")
    })
}

/// Parameters of a `Bearer` authentication challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationChallenge {
    pub authorization: Option<String>,
    pub resource: Option<String>,
    pub scope: Option<String>,
    pub parameters: HashMap<String, String>,
}

impl AuthenticationChallenge {
    /// Parse a `WWW-Authenticate` header value
    pub fn parse(header: &str) -> Result<Self> {
        let trimmed = header.trim();
        let (scheme, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(KeyVaultClientError::authentication(format!(
                "Unsupported authentication scheme '{}'",
                scheme
            )));
        }

        let parameters: HashMap<String, String> = challenge_param_regex()
            .captures_iter(rest)
            .map(|c| (c[1].to_lowercase(), c[2].to_string()))
            .collect();

        let authorization = parameters
            .get("authorization")
            .or_else(|| parameters.get("authorization_uri"))
            .cloned();
        let resource = parameters.get("resource").cloned();
        let scope = parameters.get("scope").cloned();

        if resource.is_none() && scope.is_none() {
            return Err(KeyVaultClientError::authentication(
                "Authentication challenge names neither a resource nor a scope",
            ));
        }

        Ok(Self {
            authorization,
            resource,
            scope,
            parameters,
        })
    }

    /// Scope to request a token for
    pub fn scope(&self) -> String {
        if let Some(scope) = &self.scope {
            return scope.clone();
        }
        let resource = self.resource.as_deref().unwrap_or_default();
        format!("{}/.default", resource.trim_end_matches('/'))
    }

    /// Host of the resource (or scope) the challenge asks a token for
    pub fn resource_host(&self) -> Option<String> {
        let target = self.resource.as_deref().or(self.scope.as_deref())?;
        let url = url::Url::parse(target).ok()?;
        url.host_str().map(|h| h.to_ascii_lowercase())
    }

    /// Whether the challenge resource belongs to the domain of `authority`
    ///
    /// `v.vault.azure.net` may ask for `https://vault.azure.net`, but not for
    /// `https://management.azure.com`.
    pub fn matches_authority(&self, authority: &str) -> bool {
        let Some(resource_host) = self.resource_host() else {
            return false;
        };
        let request_host = authority_host(authority).to_ascii_lowercase();
        request_host == resource_host || request_host.ends_with(&format!(".{}", resource_host))
    }

    /// Tenant named by the authorization URI, if any
    pub fn tenant_id(&self) -> Option<String> {
        let authorization = self.authorization.as_ref()?;
        let url = url::Url::parse(authorization).ok()?;
        url.path_segments()?
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Host part of a `host[:port]` authority
fn authority_host(authority: &str) -> &str {
    match authority.rsplit_once(':') {
        Some((host, port))
            if port.chars().all(|c| c.is_ascii_digit())
                && (!host.contains(':') || host.ends_with(']')) =>
        {
            host
        }
        _ => authority,
    }
}

#[derive(Clone)]
struct CachedToken {
    value: Zeroizing<String>,
    expires_on: OffsetDateTime,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_on - TOKEN_REFRESH_MARGIN > OffsetDateTime::now_utc()
    }
}

/// Signing stage that attaches bearer tokens to vault requests
pub struct ChallengeAuthorizer {
    provider: Arc<dyn VaultAuthProvider>,
    challenges: RwLock<HashMap<String, AuthenticationChallenge>>,
    tokens: RwLock<HashMap<String, CachedToken>>,
    verify_resource: bool,
}

impl ChallengeAuthorizer {
    pub fn new(provider: Arc<dyn VaultAuthProvider>) -> Self {
        Self {
            provider,
            challenges: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            verify_resource: true,
        }
    }

    /// Turn off the check that a challenge resource is in the vault's domain
    pub fn with_resource_verification(mut self, verify: bool) -> Self {
        self.verify_resource = verify;
        self
    }

    /// Authorization header value for a vault authority, if a challenge is known
    pub async fn authorization_for(&self, authority: &str) -> Result<Option<String>> {
        let challenge = self.challenges.read().await.get(authority).cloned();
        match challenge {
            Some(challenge) => {
                let token = self.token_for_scope(&challenge.scope(), false).await?;
                Ok(Some(format!("Bearer {}", token.as_str())))
            }
            None => Ok(None),
        }
    }

    /// Record a challenge received from `authority` and return a fresh authorization value
    pub async fn handle_challenge(&self, authority: &str, header: &str) -> Result<String> {
        let challenge = AuthenticationChallenge::parse(header)?;
        let scope = challenge.scope();

        if self.verify_resource && !challenge.matches_authority(authority) {
            warn!(authority, scope = %scope, "Rejected challenge for a foreign resource");
            return Err(KeyVaultClientError::authentication(format!(
                "Challenge from '{}' asks for a token for '{}', which is outside its domain",
                authority, scope
            )));
        }

        let previous = self
            .challenges
            .write()
            .await
            .insert(authority.to_string(), challenge);

        // A repeated challenge for a known scope means the cached token was rejected
        let force_refresh = previous.map(|p| p.scope() == scope).unwrap_or(false);
        info!(
            authority,
            scope = %scope,
            provider = self.provider.kind(),
            force_refresh,
            "Received authentication challenge"
        );

        let token = self.token_for_scope(&scope, force_refresh).await?;
        Ok(format!("Bearer {}", token.as_str()))
    }

    /// Challenge currently cached for an authority
    pub async fn cached_challenge(&self, authority: &str) -> Option<AuthenticationChallenge> {
        self.challenges.read().await.get(authority).cloned()
    }

    async fn token_for_scope(&self, scope: &str, force_refresh: bool) -> Result<Zeroizing<String>> {
        if !force_refresh {
            if let Some(cached) = self.tokens.read().await.get(scope) {
                if cached.is_fresh() {
                    return Ok(cached.value.clone());
                }
            }
        } else {
            self.provider.clear_cache().await?;
        }

        debug!(scope, "Acquiring access token");
        let token = self.provider.get_token(scope).await?;
        let cached = CachedToken {
            value: Zeroizing::new(token.token.secret().to_string()),
            expires_on: token.expires_on,
        };
        let value = cached.value.clone();
        self.tokens.write().await.insert(scope.to_string(), cached);
        Ok(value)
    }
}
