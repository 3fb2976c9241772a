//! Certificate and issuer operations against the vault REST API

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, instrument};

use crate::certificate::models::{
    CertificateBundle, CertificateCreateParameters, CertificateIssuerItem,
    CertificateIssuerSetParameters, CertificateItem, CertificateMergeParameters,
    CertificateOperation, CertificateOperationUpdateParameter, CertificatePolicy,
    DeletedCertificateBundle, IssuerBundle,
};
use crate::client::pipeline::{validate_object_name, with_max_results, VaultRequest};
use crate::client::KeyVaultClient;
use crate::error::Result;
use crate::identifier::PENDING_VERSION;

/// Media type of a raw certificate signing request
pub const PKCS10_CONTENT_TYPE: &str = "application/pkcs10";

/// Trait for certificate operations
#[async_trait]
pub trait CertificateOperations: Send + Sync {
    /// Fetch the signing request of a pending certificate as the raw response body
    async fn get_pending_certificate_signing_request(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<String>;

    /// Start creating a certificate; returns the pending operation
    async fn create_certificate(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        parameters: &CertificateCreateParameters,
    ) -> Result<CertificateOperation>;

    /// Get a certificate; an empty version means the latest
    async fn get_certificate(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        certificate_version: &str,
    ) -> Result<CertificateBundle>;

    async fn get_certificates(
        &self,
        vault_base_url: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<CertificateItem>>;

    async fn get_certificate_versions(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<CertificateItem>>;

    async fn delete_certificate(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<DeletedCertificateBundle>;

    async fn get_certificate_policy(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<CertificatePolicy>;

    async fn get_certificate_operation(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<CertificateOperation>;

    /// Request cancellation of a pending operation
    async fn update_certificate_operation(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        cancellation_requested: bool,
    ) -> Result<CertificateOperation>;

    async fn delete_certificate_operation(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<CertificateOperation>;

    /// Merge a certificate chain signed outside the vault into a pending certificate
    async fn merge_certificate(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        parameters: &CertificateMergeParameters,
    ) -> Result<CertificateBundle>;

    async fn set_certificate_issuer(
        &self,
        vault_base_url: &str,
        issuer_name: &str,
        parameters: &CertificateIssuerSetParameters,
    ) -> Result<IssuerBundle>;

    async fn get_certificate_issuer(
        &self,
        vault_base_url: &str,
        issuer_name: &str,
    ) -> Result<IssuerBundle>;

    async fn get_certificate_issuers(
        &self,
        vault_base_url: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<CertificateIssuerItem>>;

    async fn delete_certificate_issuer(
        &self,
        vault_base_url: &str,
        issuer_name: &str,
    ) -> Result<IssuerBundle>;
}

fn certificate_path(certificate_name: &str, suffix: &str) -> Result<String> {
    validate_object_name("certificate name", certificate_name)?;
    if suffix.is_empty() {
        Ok(format!("certificates/{}", certificate_name))
    } else {
        Ok(format!("certificates/{}/{}", certificate_name, suffix))
    }
}

fn issuer_path(issuer_name: &str) -> Result<String> {
    validate_object_name("issuer name", issuer_name)?;
    Ok(format!("certificates/issuers/{}", issuer_name))
}

#[async_trait]
impl CertificateOperations for KeyVaultClient {
    #[instrument(skip(self))]
    async fn get_pending_certificate_signing_request(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<String> {
        let path = certificate_path(certificate_name, PENDING_VERSION)?;
        let url = self.request_url(vault_base_url, &path)?;

        let request = VaultRequest::new(Method::GET, url).accept(PKCS10_CONTENT_TYPE);
        let response = self.send(request).await?;
        debug!(bytes = response.body.len(), "Fetched pending certificate signing request");
        Ok(response.body)
    }

    #[instrument(skip(self, parameters))]
    async fn create_certificate(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        parameters: &CertificateCreateParameters,
    ) -> Result<CertificateOperation> {
        let url = self.request_url(vault_base_url, &certificate_path(certificate_name, "create")?)?;
        self.send_json(Method::POST, url, parameters, &[202]).await
    }

    #[instrument(skip(self))]
    async fn get_certificate(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        certificate_version: &str,
    ) -> Result<CertificateBundle> {
        if !certificate_version.is_empty() {
            validate_object_name("certificate version", certificate_version)?;
        }
        let url = self.request_url(
            vault_base_url,
            &certificate_path(certificate_name, certificate_version)?,
        )?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn get_certificates(
        &self,
        vault_base_url: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<CertificateItem>> {
        let url = self.request_url(vault_base_url, "certificates")?;
        self.list_all(with_max_results(url, max_results)).await
    }

    #[instrument(skip(self))]
    async fn get_certificate_versions(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<CertificateItem>> {
        let path = certificate_path(certificate_name, "versions")?;
        let url = self.request_url(vault_base_url, &path)?;
        self.list_all(with_max_results(url, max_results)).await
    }

    #[instrument(skip(self))]
    async fn delete_certificate(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<DeletedCertificateBundle> {
        let url = self.request_url(vault_base_url, &certificate_path(certificate_name, "")?)?;
        self.delete_json(url).await
    }

    #[instrument(skip(self))]
    async fn get_certificate_policy(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<CertificatePolicy> {
        let url = self.request_url(vault_base_url, &certificate_path(certificate_name, "policy")?)?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn get_certificate_operation(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<CertificateOperation> {
        let path = certificate_path(certificate_name, PENDING_VERSION)?;
        let url = self.request_url(vault_base_url, &path)?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn update_certificate_operation(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        cancellation_requested: bool,
    ) -> Result<CertificateOperation> {
        let path = certificate_path(certificate_name, PENDING_VERSION)?;
        let url = self.request_url(vault_base_url, &path)?;
        let body = CertificateOperationUpdateParameter {
            cancellation_requested,
        };
        self.send_json(Method::PATCH, url, &body, &[200]).await
    }

    #[instrument(skip(self))]
    async fn delete_certificate_operation(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
    ) -> Result<CertificateOperation> {
        let path = certificate_path(certificate_name, PENDING_VERSION)?;
        let url = self.request_url(vault_base_url, &path)?;
        self.delete_json(url).await
    }

    #[instrument(skip(self, parameters))]
    async fn merge_certificate(
        &self,
        vault_base_url: &str,
        certificate_name: &str,
        parameters: &CertificateMergeParameters,
    ) -> Result<CertificateBundle> {
        let path = certificate_path(certificate_name, "pending/merge")?;
        let url = self.request_url(vault_base_url, &path)?;
        self.send_json(Method::POST, url, parameters, &[201]).await
    }

    #[instrument(skip(self, parameters))]
    async fn set_certificate_issuer(
        &self,
        vault_base_url: &str,
        issuer_name: &str,
        parameters: &CertificateIssuerSetParameters,
    ) -> Result<IssuerBundle> {
        let url = self.request_url(vault_base_url, &issuer_path(issuer_name)?)?;
        self.send_json(Method::PUT, url, parameters, &[200]).await
    }

    #[instrument(skip(self))]
    async fn get_certificate_issuer(
        &self,
        vault_base_url: &str,
        issuer_name: &str,
    ) -> Result<IssuerBundle> {
        let url = self.request_url(vault_base_url, &issuer_path(issuer_name)?)?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    async fn get_certificate_issuers(
        &self,
        vault_base_url: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<CertificateIssuerItem>> {
        let url = self.request_url(vault_base_url, "certificates/issuers")?;
        self.list_all(with_max_results(url, max_results)).await
    }

    #[instrument(skip(self))]
    async fn delete_certificate_issuer(
        &self,
        vault_base_url: &str,
        issuer_name: &str,
    ) -> Result<IssuerBundle> {
        let url = self.request_url(vault_base_url, &issuer_path(issuer_name)?)?;
        self.delete_json(url).await
    }
}
