pub mod types;
pub mod provider;
pub mod http;
pub mod mock;

// Re-export key types
pub use types::{
    AllowedInput, CertificateMaterial, ChangeRef, ChangeStatus, Enrollment, EnrollmentLocation, InputType,
    PendingChange, Status, StatusInfo, Warnings,
};
pub use provider::{CpsClient, create_cps_client};
pub use http::HttpCpsClient;
pub use mock::MockCpsClient;
