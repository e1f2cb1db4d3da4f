use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Settings;
use crate::cps::types::{
    CertificateMaterial, ChangeRef, ChangeStatus, Enrollment, EnrollmentLocation, Warnings,
};
use crate::types::Result;

/// Remote certificate provisioning system
///
/// Implementations hold no state the workflows depend on, so one handle
/// can be shared by concurrent workflows on different enrollments.
#[async_trait]
pub trait CpsClient: Send + Sync {
    /// Create an enrollment under a contract
    async fn create_enrollment(&self, contract_id: &str, enrollment: &Enrollment) -> Result<EnrollmentLocation>;

    /// Replace an enrollment's configuration
    async fn update_enrollment(
        &self,
        enrollment_id: i64,
        enrollment: &Enrollment,
        allow_cancel_pending_changes: bool,
    ) -> Result<EnrollmentLocation>;

    /// Fetch an enrollment
    async fn get_enrollment(&self, enrollment_id: i64) -> Result<Enrollment>;

    /// Fetch the status of a change
    async fn get_change_status(&self, change: ChangeRef) -> Result<ChangeStatus>;

    /// Upload third-party certificates and trust chains in one call
    async fn upload_certificate_and_trust_chain(
        &self,
        change: ChangeRef,
        materials: &[CertificateMaterial],
    ) -> Result<()>;

    /// Warnings raised by the pre-verification safety checks
    async fn get_pre_verification_warnings(&self, change: ChangeRef) -> Result<Warnings>;

    /// Warnings raised while verifying an uploaded certificate
    async fn get_post_verification_warnings(&self, change: ChangeRef) -> Result<Warnings>;

    /// Acknowledge pre-verification warnings
    async fn acknowledge_pre_verification_warnings(&self, change: ChangeRef) -> Result<()>;

    /// Acknowledge post-verification warnings
    async fn acknowledge_post_verification_warnings(&self, change: ChangeRef) -> Result<()>;

    /// Approve deployment to production
    async fn acknowledge_change_management(&self, change: ChangeRef) -> Result<()>;
}

/// Create the client described by the configuration
pub fn create_cps_client(settings: &Settings) -> Result<Arc<dyn CpsClient>> {
    match settings.client.client_type.as_str() {
        "http" => {
            let client = crate::cps::http::HttpCpsClient::new(&settings.client)?;
            Ok(Arc::new(client))
        },
        "mock" => Ok(Arc::new(crate::cps::mock::MockCpsClient::new())),
        other => Err(crate::error::Error::Config(format!("Unsupported CPS client type: {}", other))),
    }
}
