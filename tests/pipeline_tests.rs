//! Request pipeline tests
//!
//! Secret and key calls against a mock vault: request shape, paging,
//! retries of transient failures and challenge handling.

use keyvault_client::client::CLIENT_REQUEST_ID_HEADER;
use keyvault_client::key::{JsonWebKeyType, KeyCreateParameters, KeyOperations};
use keyvault_client::secret::{SecretOperations, SecretSetParameters};
use keyvault_client::utils::retry::RetryOptions;
use keyvault_client::{ClientOptions, KeyVaultClient, KeyVaultClientError, StaticTokenProvider};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retries(max_retries: usize) -> RetryOptions {
    RetryOptions {
        max_retries,
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(10),
        multiplier: 2.0,
        jitter: 0.0,
    }
}

fn client(max_retries: usize) -> KeyVaultClient {
    let options = ClientOptions {
        retry: fast_retries(max_retries),
        ..ClientOptions::default()
    };
    KeyVaultClient::new(Arc::new(StaticTokenProvider::new("test-token")), options).unwrap()
}

#[cfg(test)]
mod secret_tests {
    use super::*;

    #[tokio::test]
    async fn test_set_secret_sends_json_body_and_request_id() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/secrets/db-password"))
            .and(query_param("api-version", "7.4"))
            .and(header("content-type", "application/json"))
            .and(header_exists(CLIENT_REQUEST_ID_HEADER))
            .and(body_json(json!({ "value": "hunter2", "contentType": "text/plain" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": "hunter2",
                "id": format!("{}/secrets/db-password/0123abcd", server.uri()),
                "contentType": "text/plain",
                "attributes": { "enabled": true, "created": 1_700_000_000, "updated": 1_700_000_000 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let parameters = SecretSetParameters {
            value: "hunter2".to_string(),
            content_type: Some("text/plain".to_string()),
            ..Default::default()
        };
        let bundle = client(0)
            .set_secret(&server.uri(), "db-password", &parameters)
            .await
            .unwrap();

        assert_eq!(bundle.value.as_deref(), Some("hunter2"));
        assert_eq!(bundle.attributes.created.unwrap().timestamp(), 1_700_000_000);
        let id = bundle.identifier().unwrap().unwrap();
        assert_eq!(id.version.as_deref(), Some("0123abcd"));
    }

    #[tokio::test]
    async fn test_get_secrets_follows_next_link() {
        let server = MockServer::start().await;
        let uri = server.uri();

        Mock::given(method("GET"))
            .and(path("/secrets"))
            .and(query_param("$skiptoken", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [ { "id": format!("{}/secrets/c", uri) } ]
            })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/secrets"))
            .and(query_param("maxresults", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "id": format!("{}/secrets/a", uri), "attributes": { "enabled": true } },
                    { "id": format!("{}/secrets/b", uri), "attributes": { "enabled": false } }
                ],
                "nextLink": format!("{}/secrets?$skiptoken=page2&api-version=7.4", uri)
            })))
            .with_priority(2)
            .expect(1)
            .mount(&server)
            .await;

        let items = client(0).get_secrets(&uri, Some(2)).await.unwrap();
        let names: Vec<String> = items.iter().map(|i| i.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(items[1].attributes.enabled, Some(false));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/flaky"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": "ServiceUnavailable", "message": "try again" }
            })))
            .up_to_n_times(2)
            .with_priority(1)
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/secrets/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "ok" })))
            .with_priority(2)
            .expect(1)
            .mount(&server)
            .await;

        let bundle = client(3).get_secret(&server.uri(), "flaky", "").await.unwrap();
        assert_eq!(bundle.value.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_throttling_waits_for_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/secrets/busy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "ok" })))
            .expect(1)
            .mount(&server)
            .await;

        let options = ClientOptions {
            retry: RetryOptions {
                max_interval: Duration::from_millis(250),
                ..fast_retries(1)
            },
            ..ClientOptions::default()
        };
        let client =
            KeyVaultClient::new(Arc::new(StaticTokenProvider::new("test-token")), options)
                .unwrap();

        let started = Instant::now();
        let bundle = client.get_secret(&server.uri(), "busy", "").await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(bundle.value.as_deref(), Some("ok"));
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/bad/v1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "BadParameter", "message": "bad version" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(3).get_secret(&server.uri(), "bad", "v1").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.code(), Some("BadParameter"));
    }

    #[tokio::test]
    async fn test_retries_stop_at_limit() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/down"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(2).get_secret(&server.uri(), "down", "").await.unwrap_err();
        assert!(matches!(err, KeyVaultClientError::UnparsedErrorBody { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_delete_secret_returns_recovery_info() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/secrets/old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": format!("{}/secrets/old/1", server.uri()),
                "recoveryId": format!("{}/deletedsecrets/old", server.uri()),
                "scheduledPurgeDate": 1_800_000_000,
                "deletedDate": 1_790_000_000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let deleted = client(0).delete_secret(&server.uri(), "old").await.unwrap();
        assert_eq!(deleted.scheduled_purge_date.unwrap().timestamp(), 1_800_000_000);
        assert!(deleted.recovery_id.unwrap().ends_with("/deletedsecrets/old"));
    }

    #[tokio::test]
    async fn test_unanswerable_challenge_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/s"))
            .respond_with(
                ResponseTemplate::new(401)
                    .insert_header("WWW-Authenticate", r#"Basic realm="vault""#),
            )
            .mount(&server)
            .await;

        let err = client(0).get_secret(&server.uri(), "s", "").await.unwrap_err();
        assert!(matches!(err, KeyVaultClientError::AuthenticationError(_)));
    }
}

#[cfg(test)]
mod challenge_tests {
    use super::*;

    #[tokio::test]
    async fn test_challenge_for_foreign_resource_is_refused() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/s"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "WWW-Authenticate",
                r#"Bearer authorization="https://login.windows.net/t", resource="https://management.azure.com""#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(0).get_secret(&server.uri(), "s", "").await.unwrap_err();
        assert!(matches!(err, KeyVaultClientError::AuthenticationError(_)));

        let received = server.received_requests().await.unwrap();
        assert!(received.iter().all(|r| !r.headers.contains_key("authorization")));
    }

    #[tokio::test]
    async fn test_challenge_within_vault_domain_is_answered() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/secrets/s"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "WWW-Authenticate",
                r#"Bearer authorization="https://login.windows.net/t", resource="http://127.0.0.1""#,
            ))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/secrets/s"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "v" })))
            .expect(1)
            .mount(&server)
            .await;

        let bundle = client(0).get_secret(&server.uri(), "s", "").await.unwrap();
        assert_eq!(bundle.value.as_deref(), Some("v"));
    }
}

#[cfg(test)]
mod key_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/keys/signing/create"))
            .and(body_json(json!({ "kty": "EC", "crv": "P-256" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": {
                    "kid": format!("{}/keys/signing/5", server.uri()),
                    "kty": "EC",
                    "crv": "P-256",
                    "x": "AQ",
                    "y": "Ag"
                },
                "attributes": { "enabled": true }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut parameters = KeyCreateParameters::new(JsonWebKeyType::Ec);
        parameters.crv = Some("P-256".to_string());

        let bundle = client(0)
            .create_key(&server.uri(), "signing", &parameters)
            .await
            .unwrap();
        assert_eq!(bundle.key.kty, Some(JsonWebKeyType::Ec));
        assert_eq!(bundle.key.crv.as_deref(), Some("P-256"));
        assert!(bundle.key.rsa_key_size().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_key_versions() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/keys/signing/versions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "kid": format!("{}/keys/signing/1", server.uri()) },
                    { "kid": format!("{}/keys/signing/2", server.uri()) }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let versions = client(0)
            .get_key_versions(&server.uri(), "signing", None)
            .await
            .unwrap();
        assert_eq!(versions.len(), 2);
        assert!(versions[1].kid.ends_with("/keys/signing/2"));
    }
}
