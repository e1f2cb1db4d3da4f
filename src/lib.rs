//! CPS orchestrator - certificate enrollment workflows against a remote CPS control plane
//!
//! Drives enrollment changes through verification, warning review, upload
//! and change management by polling the remote system.

// Foundational layer
pub mod error;
pub mod types;
pub mod config;
pub mod telemetry;

// Remote layer
pub mod cps;

// Core layer
pub mod warnings;
pub mod workflow;

// Public key types
pub use crate::error::Error;
pub use crate::types::{KeyAlgorithm, Result, ValidationType};
pub use crate::config::Settings;
pub use crate::cps::{CpsClient, HttpCpsClient, MockCpsClient};
pub use crate::warnings::{can_approve, classify};
pub use crate::workflow::{
    await_verification, create_enrollment, update_enrollment, upload, ChangePoller, UploadOptions,
    VerificationOptions, VerificationOutcome, WaitContext,
};
