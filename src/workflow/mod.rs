pub mod context;
pub mod poller;
pub mod verification;
pub mod upload;
pub mod enrollment;

// Re-export key types
pub use context::WaitContext;
pub use poller::{ChangePoller, DEFAULT_POLL_INTERVAL};
pub use verification::{await_change_verification, await_verification, VerificationOptions, VerificationOutcome};
pub use upload::{upload, validate_materials, UploadOptions};
pub use enrollment::{create_enrollment, update_enrollment, EnrollmentRef};
