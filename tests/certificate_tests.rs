//! Certificate operation tests
//!
//! Runs the certificate calls against a mock vault, including the bearer
//! challenge exchange and error mapping for the pending signing request.

use keyvault_client::certificate::{
    CertificateCreateParameters, CertificateMergeParameters, CertificateOperations,
    CertificatePolicy, IssuerParameters,
};
use keyvault_client::utils::retry::RetryOptions;
use keyvault_client::{ClientOptions, KeyVaultClient, KeyVaultClientError, StaticTokenProvider};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHALLENGE: &str =
    r#"Bearer authorization="https://login.windows.net/00000000-0000-0000-0000-000000000000", resource="https://vault.azure.net""#;

const CSR: &str = "MIICrjCCAZYCAQAwHjEcMBoGA1UEAxMTd3d3LmNvbnRvc28uY29t";

fn client_without_retries() -> KeyVaultClient {
    // The mock vault listens on 127.0.0.1, outside the vault.azure.net domain
    let options = ClientOptions {
        retry: RetryOptions::none(),
        verify_challenge_resource: false,
        ..ClientOptions::default()
    };
    KeyVaultClient::new(Arc::new(StaticTokenProvider::new("test-token")), options).unwrap()
}

#[cfg(test)]
mod pending_csr_tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_csr_follows_challenge_and_returns_raw_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/certificates/web/pending"))
            .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", CHALLENGE))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/certificates/web/pending"))
            .and(query_param("api-version", "7.4"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/pkcs10"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CSR))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_without_retries();
        let csr = client
            .get_pending_certificate_signing_request(&server.uri(), "web")
            .await
            .unwrap();
        assert_eq!(csr, CSR);

        // The cached challenge authorizes the second call up front
        let again = client
            .get_pending_certificate_signing_request(&server.uri(), "web")
            .await
            .unwrap();
        assert_eq!(again, CSR);
    }

    #[tokio::test]
    async fn test_pending_csr_error_envelope() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/certificates/web/pending"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": "Forbidden", "message": "Access denied to certificates/get" }
            })))
            .mount(&server)
            .await;

        let err = client_without_retries()
            .get_pending_certificate_signing_request(&server.uri(), "web")
            .await
            .unwrap_err();

        match err {
            KeyVaultClientError::Service {
                status,
                code,
                message,
                method,
                url,
                ..
            } => {
                assert_eq!(status, 403);
                assert_eq!(code, "Forbidden");
                assert_eq!(message, "Access denied to certificates/get");
                assert_eq!(method, "GET");
                assert!(url.contains("/certificates/web/pending?api-version=7.4"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pending_csr_unparseable_error_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/certificates/web/pending"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_without_retries()
            .get_pending_certificate_signing_request(&server.uri(), "web")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(matches!(
            err,
            KeyVaultClientError::UnparsedErrorBody { ref body, .. } if body == "<html>oops</html>"
        ));
    }

    #[tokio::test]
    async fn test_pending_csr_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/certificates/missing/pending"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "PendingCertificateNotFound", "message": "Pending certificate not found" }
            })))
            .mount(&server)
            .await;

        let err = client_without_retries()
            .get_pending_certificate_signing_request(&server.uri(), "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, KeyVaultClientError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_pending_csr_validates_arguments() {
        let client = client_without_retries();

        let err = client
            .get_pending_certificate_signing_request("https://v.vault.azure.net", "")
            .await
            .unwrap_err();
        assert!(matches!(err, KeyVaultClientError::InvalidArgument(_)));

        let err = client
            .get_pending_certificate_signing_request("", "web")
            .await
            .unwrap_err();
        assert!(matches!(err, KeyVaultClientError::InvalidArgument(_)));

        let err = client
            .get_pending_certificate_signing_request("v.vault.azure.net", "web")
            .await
            .unwrap_err();
        assert!(matches!(err, KeyVaultClientError::InvalidArgument(_)));
    }
}

#[cfg(test)]
mod certificate_lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_certificate_returns_pending_operation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/certificates/web/create"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "policy": { "issuer": { "name": "Unknown" } }
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "id": format!("{}/certificates/web/pending", server.uri()),
                "issuer": { "name": "Unknown" },
                "csr": CSR,
                "cancellation_requested": false,
                "status": "inProgress"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let parameters = CertificateCreateParameters {
            certificate_policy: Some(CertificatePolicy {
                issuer_parameters: Some(IssuerParameters {
                    name: Some("Unknown".to_string()),
                    certificate_type: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let operation = client_without_retries()
            .create_certificate(&server.uri(), "web", &parameters)
            .await
            .unwrap();
        assert!(operation.is_in_progress());
        assert_eq!(operation.csr.as_deref(), Some(CSR));
    }

    #[tokio::test]
    async fn test_cancel_certificate_operation() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/certificates/web/pending"))
            .and(body_json(json!({ "cancellation_requested": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cancellation_requested": true,
                "status": "inProgress"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let operation = client_without_retries()
            .update_certificate_operation(&server.uri(), "web", true)
            .await
            .unwrap();
        assert!(operation.cancellation_requested);
    }

    #[tokio::test]
    async fn test_merge_certificate_expects_created() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/certificates/web/pending/merge"))
            .and(body_json(json!({ "x5c": ["AQID"] })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": format!("{}/certificates/web/1", server.uri()),
                "cer": "AQID",
                "attributes": { "enabled": true }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let parameters = CertificateMergeParameters {
            x5c: vec!["AQID".to_string()],
            ..Default::default()
        };
        let bundle = client_without_retries()
            .merge_certificate(&server.uri(), "web", &parameters)
            .await
            .unwrap();
        assert_eq!(bundle.cer_bytes().unwrap(), Some(vec![1, 2, 3]));
        let id = bundle.identifier().unwrap().unwrap();
        assert_eq!(id.name, "web");
        assert_eq!(id.version.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_get_certificate_issuers_names() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/certificates/issuers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    { "id": format!("{}/certificates/issuers/DigiCert", server.uri()), "provider": "DigiCert" }
                ],
                "nextLink": null
            })))
            .mount(&server)
            .await;

        let issuers = client_without_retries()
            .get_certificate_issuers(&server.uri(), None)
            .await
            .unwrap();
        assert_eq!(issuers.len(), 1);
        assert_eq!(issuers[0].name(), "DigiCert");
        assert_eq!(issuers[0].provider.as_deref(), Some("DigiCert"));
    }
}
