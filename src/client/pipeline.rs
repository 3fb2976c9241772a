//! Request pipeline
//!
//! Every vault call goes through here: URL construction with the
//! api-version, bearer challenge signing, retries for transient failures and
//! the mapping of non-success responses onto `KeyVaultClientError`.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use regex::Regex;
use reqwest::header::{
    HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER, WWW_AUTHENTICATE,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::client::models::{KeyVaultError, Page};
use crate::client::KeyVaultClient;
use crate::error::{KeyVaultClientError, Result};
use crate::identifier::normalize_vault;
use crate::utils::network::classify_network_error;
use crate::utils::retry::retry_with_backoff;

pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";
pub const JSON_CONTENT_TYPE: &str = "application/json";

const MAX_OBJECT_NAME_LENGTH: usize = 127;

fn object_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-zA-Z-]+$").expect("static name regex is valid"))
}

/// Check an object or version name before it is placed into a URL path
pub fn validate_object_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KeyVaultClientError::invalid_argument(format!(
            "{} must not be empty",
            kind
        )));
    }
    if name.len() > MAX_OBJECT_NAME_LENGTH || !object_name_regex().is_match(name) {
        return Err(KeyVaultClientError::invalid_argument(format!(
            "{} '{}' must be 1-{} characters of 0-9, a-z, A-Z and -",
            kind, name, MAX_OBJECT_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Add the `maxresults` page-size hint to a list URL
pub fn with_max_results(mut url: Url, max_results: Option<u32>) -> Url {
    if let Some(max) = max_results {
        url.query_pairs_mut().append_pair("maxresults", &max.to_string());
    }
    url
}

/// A single logical vault call
#[derive(Debug, Clone)]
pub struct VaultRequest {
    pub method: Method,
    pub url: Url,
    pub accept: &'static str,
    pub body: Option<Vec<u8>>,
    pub expected: &'static [u16],
}

impl VaultRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            accept: JSON_CONTENT_TYPE,
            body: None,
            expected: &[200],
        }
    }

    pub fn accept(mut self, accept: &'static str) -> Self {
        self.accept = accept;
        self
    }

    pub fn expect(mut self, expected: &'static [u16]) -> Self {
        self.expected = expected;
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}

/// Raw outcome of a successful call
#[derive(Debug)]
pub struct VaultResponse {
    pub status: StatusCode,
    pub body: String,
}

impl VaultResponse {
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            KeyVaultClientError::serialization(format!(
                "Failed to parse response (HTTP {}): {}",
                self.status, e
            ))
        })
    }
}

impl KeyVaultClient {
    /// `{vault}/{path}?api-version=...`
    pub fn request_url(&self, vault_base_url: &str, path: &str) -> Result<Url> {
        let vault = normalize_vault(vault_base_url)?;
        let mut url = Url::parse(&format!("{}/{}", vault, path.trim_start_matches('/')))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.options.api_version);
        Ok(url)
    }

    /// Absolute `nextLink` from a list page, with the api-version guaranteed
    pub fn next_link_url(&self, next_link: &str) -> Result<Url> {
        let mut url = Url::parse(next_link)?;
        if !url.query_pairs().any(|(k, _)| k == "api-version") {
            url.query_pairs_mut()
                .append_pair("api-version", &self.options.api_version);
        }
        Ok(url)
    }

    /// Send a request through the retry policy
    pub async fn send(&self, request: VaultRequest) -> Result<VaultResponse> {
        retry_with_backoff(|| self.send_once(&request), self.options.retry.clone()).await
    }

    async fn send_once(&self, request: &VaultRequest) -> Result<VaultResponse> {
        let authority = request.authority();
        let authorization = self.authorizer.authorization_for(&authority).await?;

        let (status, headers, body) = self.dispatch(request, authorization.as_deref()).await?;

        let challenge = match headers.get(WWW_AUTHENTICATE) {
            Some(value) if status == StatusCode::UNAUTHORIZED => Some(
                value
                    .to_str()
                    .map(str::to_string)
                    .map_err(|e| {
                        KeyVaultClientError::authentication(format!(
                            "Unreadable challenge header: {}",
                            e
                        ))
                    })?,
            ),
            _ => None,
        };

        let (status, headers, body) = match challenge {
            Some(challenge) => {
                let authorization = self.authorizer.handle_challenge(&authority, &challenge).await?;
                self.dispatch(request, Some(&authorization)).await?
            }
            None => (status, headers, body),
        };

        classify_response(request, status, &headers, body)
    }

    async fn dispatch(
        &self,
        request: &VaultRequest,
        authorization: Option<&str>,
    ) -> Result<(StatusCode, HeaderMap, String)> {
        let request_id = Uuid::new_v4().to_string();
        debug!(
            method = %request.method,
            url = %request.url,
            request_id = %request_id,
            authorized = authorization.is_some(),
            "Sending Key Vault request"
        );

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .header(ACCEPT, request.accept)
            .header(CLIENT_REQUEST_ID_HEADER, &request_id);

        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_network_error(&e, request.url.as_str()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_network_error(&e, request.url.as_str()))?;

        debug!(status = status.as_u16(), request_id = %request_id, "Received Key Vault response");
        Ok((status, headers, body))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.send(VaultRequest::new(Method::GET, url)).await?.parse()
    }

    pub async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        expected: &'static [u16],
    ) -> Result<T> {
        let request = VaultRequest::new(method, url).json(body)?.expect(expected);
        self.send(request).await?.parse()
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.send(VaultRequest::new(Method::DELETE, url)).await?.parse()
    }

    /// Pages of a list operation, following `nextLink`
    pub fn pages<'a, T>(&'a self, first: Url) -> BoxStream<'a, Result<Page<T>>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        stream::try_unfold(Some(first), move |next| async move {
            let url = match next {
                Some(url) => url,
                None => return Ok(None),
            };
            let page: Page<T> = self.get_json(url).await?;
            let following = match page.next_link.as_deref() {
                Some(link) if !link.is_empty() => Some(self.next_link_url(link)?),
                _ => None,
            };
            Ok(Some((page, following)))
        })
        .boxed()
    }

    /// Every item of a list operation
    pub async fn list_all<T>(&self, first: Url) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let pages: Vec<Page<T>> = self.pages(first).try_collect().await?;
        Ok(pages.into_iter().flat_map(|page| page.value).collect())
    }
}

/// Map a response onto the caller's expectation or a classified error
pub fn classify_response(
    request: &VaultRequest,
    status: StatusCode,
    headers: &HeaderMap,
    body: String,
) -> Result<VaultResponse> {
    if request.expected.contains(&status.as_u16()) {
        return Ok(VaultResponse { status, body });
    }

    let retry_after = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    match serde_json::from_str::<KeyVaultError>(&body) {
        Ok(envelope) if status == StatusCode::NOT_FOUND => Err(KeyVaultClientError::NotFound {
            url: request.url.to_string(),
            message: envelope.error.message,
        }),
        Ok(envelope) => Err(KeyVaultClientError::Service {
            status: status.as_u16(),
            code: envelope.error.code,
            message: envelope.error.message,
            method: request.method.to_string(),
            url: request.url.to_string(),
            body,
            retry_after,
        }),
        Err(e) => Err(KeyVaultClientError::UnparsedErrorBody {
            status: status.as_u16(),
            method: request.method.to_string(),
            url: request.url.to_string(),
            body,
            reason: e.to_string(),
            retry_after,
        }),
    }
}
