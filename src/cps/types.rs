use std::fmt;
use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::types::{KeyAlgorithm, Result, ValidationType};

/// Status of a change
///
/// Known remote literals map to named variants; anything else is kept
/// verbatim in `Other` so new remote statuses do not break polling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Safety checks running before verification
    PreVerificationSafetyChecks,
    /// Safety checks produced warnings awaiting review
    WaitReviewPreVerificationSafetyChecks,
    /// Domain validation challenges are being coordinated
    CoordinateDomainValidation,
    /// Waiting for a third-party certificate upload
    WaitUploadThirdParty,
    /// Uploaded third-party certificate is being verified
    VerifyThirdPartyCert,
    /// Uploaded certificate produced warnings awaiting review
    WaitReviewThirdPartyCert,
    /// Waiting for change management sign-off
    WaitAckChangeManagement,
    /// Deploying to staging
    DeployCertStaging,
    /// Deploying to production
    DeployCertProduction,
    /// Change finished
    Complete,
    /// Status not known to this crate
    Other(String),
}

impl Status {
    /// Remote literal
    pub fn as_str(&self) -> &str {
        match self {
            Status::PreVerificationSafetyChecks => "pre-verification-safety-checks",
            Status::WaitReviewPreVerificationSafetyChecks => "wait-review-pre-verification-safety-checks",
            // The remote system spells it this way.
            Status::CoordinateDomainValidation => "coodinate-domain-validation",
            Status::WaitUploadThirdParty => "wait-upload-third-party",
            Status::VerifyThirdPartyCert => "verify-third-party-cert",
            Status::WaitReviewThirdPartyCert => "wait-review-third-party-cert",
            Status::WaitAckChangeManagement => "wait-ack-change-management",
            Status::DeployCertStaging => "deploy-cert-staging",
            Status::DeployCertProduction => "deploy-cert-production",
            Status::Complete => "complete",
            Status::Other(other) => other,
        }
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pre-verification-safety-checks" => Status::PreVerificationSafetyChecks,
            "wait-review-pre-verification-safety-checks" => Status::WaitReviewPreVerificationSafetyChecks,
            "coodinate-domain-validation" => Status::CoordinateDomainValidation,
            "wait-upload-third-party" => Status::WaitUploadThirdParty,
            "verify-third-party-cert" => Status::VerifyThirdPartyCert,
            "wait-review-third-party-cert" => Status::WaitReviewThirdPartyCert,
            "wait-ack-change-management" => Status::WaitAckChangeManagement,
            "deploy-cert-staging" => Status::DeployCertStaging,
            "deploy-cert-production" => Status::DeployCertProduction,
            "complete" => Status::Complete,
            _ => Status::Other(value),
        }
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Status::from(value.to_string())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of operator input a change is waiting for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InputType {
    /// DV challenges
    LetsEncryptChallenges,
    /// CSR for a third-party certificate
    ThirdPartyCsr,
    /// Upload of a third-party certificate
    ThirdPartyCertificate,
    /// Acknowledgement of pre-verification warnings
    PreVerificationWarningsAck,
    /// Acknowledgement of post-verification warnings
    PostVerificationWarningsAck,
    /// Change management sign-off
    ChangeManagementInfo,
    /// Input type not known to this crate
    Other(String),
}

impl InputType {
    /// Remote literal
    pub fn as_str(&self) -> &str {
        match self {
            InputType::LetsEncryptChallenges => "lets-encrypt-challenges",
            InputType::ThirdPartyCsr => "third-party-csr",
            InputType::ThirdPartyCertificate => "third-party-certificate",
            InputType::PreVerificationWarningsAck => "pre-verification-warnings-acknowledgement",
            InputType::PostVerificationWarningsAck => "post-verification-warnings-acknowledgement",
            InputType::ChangeManagementInfo => "change-management-info",
            InputType::Other(other) => other,
        }
    }
}

impl From<String> for InputType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "lets-encrypt-challenges" => InputType::LetsEncryptChallenges,
            "third-party-csr" => InputType::ThirdPartyCsr,
            "third-party-certificate" => InputType::ThirdPartyCertificate,
            "pre-verification-warnings-acknowledgement" => InputType::PreVerificationWarningsAck,
            "post-verification-warnings-acknowledgement" => InputType::PostVerificationWarningsAck,
            "change-management-info" => InputType::ChangeManagementInfo,
            _ => InputType::Other(value),
        }
    }
}

impl From<InputType> for String {
    fn from(input: InputType) -> Self {
        input.as_str().to_string()
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one change of one enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeRef {
    /// Enrollment ID
    pub enrollment_id: i64,
    /// Change ID
    pub change_id: i64,
}

impl ChangeRef {
    /// Create a new change reference
    pub fn new(enrollment_id: i64, change_id: i64) -> Self {
        Self { enrollment_id, change_id }
    }
}

impl fmt::Display for ChangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enrollment {} change {}", self.enrollment_id, self.change_id)
    }
}

/// Error reported by the remote system on a change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Progress details of a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    /// Current status
    pub status: Status,
    /// Coarse state (running, awaiting-input, ...)
    #[serde(default)]
    pub state: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Remote error, if the change failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StatusError>,
}

/// Input the remote system is waiting for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedInput {
    #[serde(rename = "type")]
    pub input_type: InputType,
    #[serde(default)]
    pub required_to_proceed: bool,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub update: String,
}

impl AllowedInput {
    /// Allowed input of the given type with no links
    pub fn of(input_type: InputType) -> Self {
        Self {
            input_type,
            required_to_proceed: true,
            info: String::new(),
            update: String::new(),
        }
    }
}

/// Change status response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_info: Option<StatusInfo>,
    #[serde(default)]
    pub allowed_input: Vec<AllowedInput>,
}

impl ChangeStatus {
    /// Status with no allowed input
    pub fn with_status(status: Status) -> Self {
        Self {
            status_info: Some(StatusInfo {
                status,
                state: String::new(),
                description: String::new(),
                error: None,
            }),
            allowed_input: Vec::new(),
        }
    }

    /// Add an allowed input
    pub fn allowing(mut self, input_type: InputType) -> Self {
        self.allowed_input.push(AllowedInput::of(input_type));
        self
    }

    /// Current status, if reported
    pub fn status(&self) -> Option<&Status> {
        self.status_info.as_ref().map(|info| &info.status)
    }

    /// Current status for messages, empty when not reported
    pub fn status_label(&self) -> String {
        self.status().map(|s| s.to_string()).unwrap_or_default()
    }

    /// Whether the status equals `status`
    pub fn is(&self, status: &Status) -> bool {
        self.status() == Some(status)
    }

    /// Whether the remote system accepts input of the given type
    pub fn allows(&self, input_type: &InputType) -> bool {
        self.allowed_input.iter().any(|input| &input.input_type == input_type)
    }

    /// Remote error description, when the change failed
    pub fn failure(&self) -> Option<&str> {
        self.status_info
            .as_ref()
            .and_then(|info| info.error.as_ref())
            .map(|err| err.description.as_str())
            .filter(|description| !description.is_empty())
    }

    /// Fail if the remote system reported an error on this change
    pub fn ensure_not_failed(&self) -> Result<()> {
        match self.failure() {
            Some(description) => Err(Error::ChangeFailed {
                status: self.status_label(),
                description: description.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Reference to the change currently in flight on an enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    /// Change path, e.g. `/cps/v2/enrollments/10/changes/20`
    pub location: String,
    #[serde(default)]
    pub change_type: String,
}

impl PendingChange {
    /// Change ID parsed from the location
    pub fn change_id(&self) -> Result<i64> {
        id_from_location(&self.location)
    }
}

/// Enrollment as seen by the orchestration core
///
/// Only the fields the workflows read are typed; everything else is
/// carried untouched so the caller's payload round trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_type: Option<ValidationType>,
    #[serde(default)]
    pub change_management: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_changes: Vec<PendingChange>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Enrollment {
    /// ID of the pending change, if any
    pub fn pending_change_id(&self) -> Result<Option<i64>> {
        match self.pending_changes.first() {
            Some(change) => change.change_id().map(Some),
            None => Ok(None),
        }
    }
}

/// Locations returned by create and update calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentLocation {
    /// Enrollment path, e.g. `/cps/v2/enrollments/10`
    pub enrollment: String,
    /// Change paths created by the call
    #[serde(default)]
    pub changes: Vec<String>,
}

impl EnrollmentLocation {
    /// Enrollment ID parsed from the location
    pub fn enrollment_id(&self) -> Result<i64> {
        id_from_location(&self.enrollment)
    }

    /// ID of the first change created by the call
    pub fn change_id(&self) -> Result<Option<i64>> {
        match self.changes.first() {
            Some(location) => id_from_location(location).map(Some),
            None => Ok(None),
        }
    }
}

/// Certificate and optional trust chain for one key algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateMaterial {
    pub key_algorithm: KeyAlgorithm,
    #[serde(default)]
    pub certificate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_chain: Option<String>,
}

impl CertificateMaterial {
    /// Material with a certificate and optional chain
    pub fn new(key_algorithm: KeyAlgorithm, certificate: impl Into<String>, trust_chain: Option<String>) -> Self {
        Self {
            key_algorithm,
            certificate: certificate.into(),
            trust_chain,
        }
    }

    /// Whether a non-blank certificate is present
    pub fn has_certificate(&self) -> bool {
        !self.certificate.trim().is_empty()
    }

    /// Whether a non-blank trust chain is present
    pub fn has_trust_chain(&self) -> bool {
        self.trust_chain
            .as_deref()
            .map(|chain| !chain.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Warning text attached to a change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warnings {
    #[serde(default)]
    pub warnings: String,
}

/// Acknowledgement body; only `acknowledge` is ever sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub acknowledgement: String,
}

impl Acknowledgement {
    /// Positive acknowledgement
    pub fn acknowledge() -> Self {
        Self {
            acknowledgement: "acknowledge".to_string(),
        }
    }
}

/// Parse the trailing numeric segment of a location path
pub fn id_from_location(location: &str) -> Result<i64> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<i64>().ok())
        .ok_or_else(|| Error::InvalidLocation(location.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_location() {
        assert_eq!(id_from_location("/cps/v2/enrollments/10/changes/20").unwrap(), 20);
        assert_eq!(id_from_location("/cps/v2/enrollments/10/").unwrap(), 10);
        assert!(matches!(
            id_from_location("/cps/v2/enrollments/abc"),
            Err(Error::InvalidLocation(_))
        ));
        assert!(id_from_location("").is_err());
    }

    #[test]
    fn test_status_literals() {
        let status: Status = "coodinate-domain-validation".into();
        assert_eq!(status, Status::CoordinateDomainValidation);
        assert_eq!(status.as_str(), "coodinate-domain-validation");

        let unknown: Status = "brand-new-status".into();
        assert_eq!(unknown, Status::Other("brand-new-status".into()));
        assert_eq!(unknown.to_string(), "brand-new-status");
    }

    #[test]
    fn test_change_status_parsing() {
        let json = r#"{
            "statusInfo": {
                "status": "wait-upload-third-party",
                "state": "awaiting-input",
                "description": "Waiting for you to upload and submit your third party certificate and trust chain."
            },
            "allowedInput": [
                {
                    "type": "third-party-certificate",
                    "requiredToProceed": true,
                    "info": "/cps/v2/enrollments/1/changes/2/input/info/third-party-csr",
                    "update": "/cps/v2/enrollments/1/changes/2/input/update/third-party-cert-and-trust-chain"
                }
            ]
        }"#;

        let change: ChangeStatus = serde_json::from_str(json).unwrap();
        assert!(change.is(&Status::WaitUploadThirdParty));
        assert!(change.allows(&InputType::ThirdPartyCertificate));
        assert!(!change.allows(&InputType::LetsEncryptChallenges));
        assert!(change.ensure_not_failed().is_ok());
    }

    #[test]
    fn test_change_status_failure() {
        let mut change = ChangeStatus::with_status(Status::VerifyThirdPartyCert);
        change.status_info.as_mut().unwrap().error = Some(StatusError {
            code: "error.certificate".into(),
            description: "certificate rejected".into(),
            timestamp: String::new(),
        });

        match change.ensure_not_failed() {
            Err(Error::ChangeFailed { status, description }) => {
                assert_eq!(status, "verify-third-party-cert");
                assert_eq!(description, "certificate rejected");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_enrollment_keeps_unknown_fields() {
        let json = r#"{
            "validationType": "third-party",
            "changeManagement": true,
            "pendingChanges": [{"location": "/cps/v2/enrollments/5/changes/77", "changeType": "new-certificate"}],
            "ra": "third-party",
            "csr": {"cn": "www.example.com"}
        }"#;

        let enrollment: Enrollment = serde_json::from_str(json).unwrap();
        assert_eq!(enrollment.validation_type, Some(ValidationType::ThirdParty));
        assert!(enrollment.change_management);
        assert_eq!(enrollment.pending_change_id().unwrap(), Some(77));
        assert_eq!(enrollment.extra["ra"], "third-party");

        let back = serde_json::to_value(&enrollment).unwrap();
        assert_eq!(back["csr"]["cn"], "www.example.com");
    }

    #[test]
    fn test_material_blank_fields() {
        let material = CertificateMaterial::new(KeyAlgorithm::Rsa, "  ", Some("\n".into()));
        assert!(!material.has_certificate());
        assert!(!material.has_trust_chain());
    }
}
