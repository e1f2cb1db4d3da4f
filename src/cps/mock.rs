use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;
use tracing::debug;

use crate::cps::provider::CpsClient;
use crate::cps::types::{
    CertificateMaterial, ChangeRef, ChangeStatus, Enrollment, EnrollmentLocation, Warnings,
};
use crate::error::Error;
use crate::types::Result;

/// Remote operation, used to inject failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateEnrollment,
    UpdateEnrollment,
    GetEnrollment,
    GetChangeStatus,
    UploadCertificateAndTrustChain,
    GetPreVerificationWarnings,
    GetPostVerificationWarnings,
    AcknowledgePreVerificationWarnings,
    AcknowledgePostVerificationWarnings,
    AcknowledgeChangeManagement,
}

/// A recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateEnrollment { contract_id: String },
    UpdateEnrollment { enrollment_id: i64, allow_cancel_pending_changes: bool },
    GetEnrollment { enrollment_id: i64 },
    GetChangeStatus(ChangeRef),
    UploadCertificateAndTrustChain { change: ChangeRef, materials: Vec<CertificateMaterial> },
    GetPreVerificationWarnings(ChangeRef),
    GetPostVerificationWarnings(ChangeRef),
    AcknowledgePreVerificationWarnings(ChangeRef),
    AcknowledgePostVerificationWarnings(ChangeRef),
    AcknowledgeChangeManagement(ChangeRef),
}

impl Call {
    /// Operation this call belongs to
    pub fn operation(&self) -> Operation {
        match self {
            Call::CreateEnrollment { .. } => Operation::CreateEnrollment,
            Call::UpdateEnrollment { .. } => Operation::UpdateEnrollment,
            Call::GetEnrollment { .. } => Operation::GetEnrollment,
            Call::GetChangeStatus(_) => Operation::GetChangeStatus,
            Call::UploadCertificateAndTrustChain { .. } => Operation::UploadCertificateAndTrustChain,
            Call::GetPreVerificationWarnings(_) => Operation::GetPreVerificationWarnings,
            Call::GetPostVerificationWarnings(_) => Operation::GetPostVerificationWarnings,
            Call::AcknowledgePreVerificationWarnings(_) => Operation::AcknowledgePreVerificationWarnings,
            Call::AcknowledgePostVerificationWarnings(_) => Operation::AcknowledgePostVerificationWarnings,
            Call::AcknowledgeChangeManagement(_) => Operation::AcknowledgeChangeManagement,
        }
    }
}

#[derive(Default)]
struct MockState {
    enrollment: Enrollment,
    location: EnrollmentLocation,
    statuses: VecDeque<ChangeStatus>,
    last_status: ChangeStatus,
    pre_verification_warnings: String,
    post_verification_warnings: String,
    failures: HashMap<Operation, String>,
    calls: Vec<Call>,
}

/// Scripted in-memory CPS for tests and dry runs (`client.client_type = "mock"`)
///
/// Change statuses are served from a queue; once the queue drains the
/// last served status keeps being returned.
#[derive(Default)]
pub struct MockCpsClient {
    state: Mutex<MockState>,
}

impl MockCpsClient {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enrollment returned by `get_enrollment`
    pub fn with_enrollment(self, enrollment: Enrollment) -> Self {
        self.lock().enrollment = enrollment;
        self
    }

    /// Location returned by create and update calls
    pub fn with_location(self, location: EnrollmentLocation) -> Self {
        self.lock().location = location;
        self
    }

    /// Queue change statuses, served in order
    pub fn with_statuses<I>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = ChangeStatus>,
    {
        self.lock().statuses.extend(statuses);
        self
    }

    /// Pre-verification warning text
    pub fn with_pre_verification_warnings(self, warnings: impl Into<String>) -> Self {
        self.lock().pre_verification_warnings = warnings.into();
        self
    }

    /// Post-verification warning text
    pub fn with_post_verification_warnings(self, warnings: impl Into<String>) -> Self {
        self.lock().post_verification_warnings = warnings.into();
        self
    }

    /// Make every call of `operation` fail with an API error
    pub fn failing(self, operation: Operation, message: impl Into<String>) -> Self {
        self.lock().failures.insert(operation, message.into());
        self
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls of one operation
    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    fn record(&self, call: Call) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        let operation = call.operation();
        debug!("Mock CPS: {:?}", call);
        state.calls.push(call);

        if let Some(message) = state.failures.get(&operation) {
            return Err(Error::Api {
                status: 500,
                body: message.clone(),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl CpsClient for MockCpsClient {
    async fn create_enrollment(&self, contract_id: &str, _enrollment: &Enrollment) -> Result<EnrollmentLocation> {
        let state = self.record(Call::CreateEnrollment {
            contract_id: contract_id.to_string(),
        })?;
        Ok(state.location.clone())
    }

    async fn update_enrollment(
        &self,
        enrollment_id: i64,
        _enrollment: &Enrollment,
        allow_cancel_pending_changes: bool,
    ) -> Result<EnrollmentLocation> {
        let state = self.record(Call::UpdateEnrollment {
            enrollment_id,
            allow_cancel_pending_changes,
        })?;
        Ok(state.location.clone())
    }

    async fn get_enrollment(&self, enrollment_id: i64) -> Result<Enrollment> {
        let state = self.record(Call::GetEnrollment { enrollment_id })?;
        Ok(state.enrollment.clone())
    }

    async fn get_change_status(&self, change: ChangeRef) -> Result<ChangeStatus> {
        let mut state = self.record(Call::GetChangeStatus(change))?;
        if let Some(next) = state.statuses.pop_front() {
            state.last_status = next;
        }
        Ok(state.last_status.clone())
    }

    async fn upload_certificate_and_trust_chain(
        &self,
        change: ChangeRef,
        materials: &[CertificateMaterial],
    ) -> Result<()> {
        let _state = self.record(Call::UploadCertificateAndTrustChain {
            change,
            materials: materials.to_vec(),
        })?;
        Ok(())
    }

    async fn get_pre_verification_warnings(&self, change: ChangeRef) -> Result<Warnings> {
        let state = self.record(Call::GetPreVerificationWarnings(change))?;
        Ok(Warnings {
            warnings: state.pre_verification_warnings.clone(),
        })
    }

    async fn get_post_verification_warnings(&self, change: ChangeRef) -> Result<Warnings> {
        let state = self.record(Call::GetPostVerificationWarnings(change))?;
        Ok(Warnings {
            warnings: state.post_verification_warnings.clone(),
        })
    }

    async fn acknowledge_pre_verification_warnings(&self, change: ChangeRef) -> Result<()> {
        let _state = self.record(Call::AcknowledgePreVerificationWarnings(change))?;
        Ok(())
    }

    async fn acknowledge_post_verification_warnings(&self, change: ChangeRef) -> Result<()> {
        let _state = self.record(Call::AcknowledgePostVerificationWarnings(change))?;
        Ok(())
    }

    async fn acknowledge_change_management(&self, change: ChangeRef) -> Result<()> {
        let _state = self.record(Call::AcknowledgeChangeManagement(change))?;
        Ok(())
    }
}
