use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE}};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::cps::provider::CpsClient;
use crate::cps::types::{
    Acknowledgement, CertificateMaterial, ChangeRef, ChangeStatus, Enrollment, EnrollmentLocation, Warnings,
};
use crate::error::Error;
use crate::types::Result;

const ENROLLMENT_MEDIA_TYPE: &str = "application/vnd.akamai.cps.enrollment.v11+json";
const ENROLLMENT_STATUS_MEDIA_TYPE: &str = "application/vnd.akamai.cps.enrollment-status.v1+json";
const CHANGE_MEDIA_TYPE: &str = "application/vnd.akamai.cps.change.v2+json";
const CERT_AND_CHAIN_MEDIA_TYPE: &str = "application/vnd.akamai.cps.certificate-and-trust-chain.v2+json";
const CHANGE_ID_MEDIA_TYPE: &str = "application/vnd.akamai.cps.change-id.v1+json";
const WARNINGS_MEDIA_TYPE: &str = "application/vnd.akamai.cps.warnings.v1+json";
const ACK_MEDIA_TYPE: &str = "application/vnd.akamai.cps.acknowledgement.v1+json";

/// Upload body for third-party certificates
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CertificatesAndTrustChains<'a> {
    certificates_and_trust_chains: &'a [CertificateMaterial],
}

/// CPS REST API client
pub struct HttpCpsClient {
    /// HTTP client
    client: Client,
    /// API base URL
    base_url: Url,
    /// Bearer token
    token: Option<String>,
}

impl HttpCpsClient {
    /// Create a new CPS client
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(Error::Config("CPS base URL not configured".into()));
        }
        let base_url = Url::parse(&config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::HttpClient(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token: config.access_token.clone(),
        })
    }

    /// Create authorization headers
    fn create_auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &self.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| Error::HttpClient(format!("Invalid token: {}", e)))?
            );
        }

        Ok(headers)
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn change_path(change: ChangeRef) -> String {
        format!("/cps/v2/enrollments/{}/changes/{}", change.enrollment_id, change.change_id)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .headers(self.create_auth_headers()?)
            .send()
            .await
            .map_err(|e| Error::HttpClient(format!("Failed to send request to CPS: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Api { status, body });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, accept: &'static str) -> Result<T> {
        debug!("GET {}", path);
        let request = self.client.get(self.url(path)?).header(ACCEPT, accept);
        let response = self.send(request).await?;
        response.json().await
            .map_err(|e| Error::HttpClient(format!("Failed to parse CPS response: {}", e)))
    }

    async fn post_ack(&self, change: ChangeRef, input: &str) -> Result<()> {
        let path = format!("{}/input/update/{}", Self::change_path(change), input);
        debug!("POST {}", path);
        let body = serde_json::to_vec(&Acknowledgement::acknowledge())?;
        let request = self.client.post(self.url(&path)?)
            .header(ACCEPT, CHANGE_ID_MEDIA_TYPE)
            .header(CONTENT_TYPE, ACK_MEDIA_TYPE)
            .body(body);
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl CpsClient for HttpCpsClient {
    async fn create_enrollment(&self, contract_id: &str, enrollment: &Enrollment) -> Result<EnrollmentLocation> {
        debug!("Creating enrollment under contract {}", contract_id);
        let mut url = self.url("/cps/v2/enrollments")?;
        url.query_pairs_mut().append_pair("contractId", contract_id);

        let request = self.client.post(url)
            .header(ACCEPT, ENROLLMENT_STATUS_MEDIA_TYPE)
            .header(CONTENT_TYPE, ENROLLMENT_MEDIA_TYPE)
            .body(serde_json::to_vec(enrollment)?);
        let location: EnrollmentLocation = self.send(request).await?.json().await
            .map_err(|e| Error::HttpClient(format!("Failed to parse CPS response: {}", e)))?;

        Ok(location)
    }

    async fn update_enrollment(
        &self,
        enrollment_id: i64,
        enrollment: &Enrollment,
        allow_cancel_pending_changes: bool,
    ) -> Result<EnrollmentLocation> {
        debug!("Updating enrollment {}", enrollment_id);
        let mut url = self.url(&format!("/cps/v2/enrollments/{}", enrollment_id))?;
        if allow_cancel_pending_changes {
            url.query_pairs_mut().append_pair("allow-cancel-pending-changes", "true");
        }

        let request = self.client.put(url)
            .header(ACCEPT, ENROLLMENT_STATUS_MEDIA_TYPE)
            .header(CONTENT_TYPE, ENROLLMENT_MEDIA_TYPE)
            .body(serde_json::to_vec(enrollment)?);
        let location: EnrollmentLocation = self.send(request).await?.json().await
            .map_err(|e| Error::HttpClient(format!("Failed to parse CPS response: {}", e)))?;

        Ok(location)
    }

    async fn get_enrollment(&self, enrollment_id: i64) -> Result<Enrollment> {
        self.get_json(&format!("/cps/v2/enrollments/{}", enrollment_id), ENROLLMENT_MEDIA_TYPE).await
    }

    async fn get_change_status(&self, change: ChangeRef) -> Result<ChangeStatus> {
        self.get_json(&Self::change_path(change), CHANGE_MEDIA_TYPE).await
    }

    async fn upload_certificate_and_trust_chain(
        &self,
        change: ChangeRef,
        materials: &[CertificateMaterial],
    ) -> Result<()> {
        let path = format!("{}/input/update/third-party-cert-and-trust-chain", Self::change_path(change));
        debug!("POST {} ({} certificates)", path, materials.len());
        let body = serde_json::to_vec(&CertificatesAndTrustChains {
            certificates_and_trust_chains: materials,
        })?;

        let request = self.client.post(self.url(&path)?)
            .header(ACCEPT, CHANGE_ID_MEDIA_TYPE)
            .header(CONTENT_TYPE, CERT_AND_CHAIN_MEDIA_TYPE)
            .body(body);
        self.send(request).await?;
        Ok(())
    }

    async fn get_pre_verification_warnings(&self, change: ChangeRef) -> Result<Warnings> {
        let path = format!("{}/input/info/pre-verification-warnings", Self::change_path(change));
        self.get_json(&path, WARNINGS_MEDIA_TYPE).await
    }

    async fn get_post_verification_warnings(&self, change: ChangeRef) -> Result<Warnings> {
        let path = format!("{}/input/info/post-verification-warnings", Self::change_path(change));
        self.get_json(&path, WARNINGS_MEDIA_TYPE).await
    }

    async fn acknowledge_pre_verification_warnings(&self, change: ChangeRef) -> Result<()> {
        self.post_ack(change, "pre-verification-warnings-ack").await
    }

    async fn acknowledge_post_verification_warnings(&self, change: ChangeRef) -> Result<()> {
        self.post_ack(change, "post-verification-warnings-ack").await
    }

    async fn acknowledge_change_management(&self, change: ChangeRef) -> Result<()> {
        self.post_ack(change, "change-management-ack").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_config(base_url: &str) -> ClientConfig {
        ClientConfig {
            base_url: base_url.to_string(),
            access_token: Some("secret".to_string()),
            request_timeout_secs: 5,
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_requires_base_url() {
        let result = HttpCpsClient::new(&client_config(""));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_change_urls() {
        let client = HttpCpsClient::new(&client_config("https://cps.example.com/")).unwrap();
        let change = ChangeRef::new(10, 20);
        let url = client.url(&format!("{}/input/info/pre-verification-warnings", HttpCpsClient::change_path(change))).unwrap();
        assert_eq!(
            url.as_str(),
            "https://cps.example.com/cps/v2/enrollments/10/changes/20/input/info/pre-verification-warnings"
        );
    }

    #[test]
    fn test_auth_header() {
        let client = HttpCpsClient::new(&client_config("https://cps.example.com")).unwrap();
        let headers = client.create_auth_headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret");
    }

    #[test]
    fn test_upload_body_shape() {
        let materials = vec![CertificateMaterial::new(
            crate::types::KeyAlgorithm::Rsa,
            "-----BEGIN CERTIFICATE-----",
            None,
        )];
        let body = serde_json::to_value(CertificatesAndTrustChains {
            certificates_and_trust_chains: &materials,
        }).unwrap();
        assert_eq!(body["certificatesAndTrustChains"][0]["keyAlgorithm"], "RSA");
        assert!(body["certificatesAndTrustChains"][0].get("trustChain").is_none());
    }
}
