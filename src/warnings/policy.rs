use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::Error;
use crate::types::Result;
use crate::warnings::classifier::classify;

/// Check that every warning in `warnings` is covered by `approved_codes`
///
/// Returns `Ok(())` when nothing needs approval or everything is
/// approved. Classification failures propagate as
/// [`Error::UnknownWarnings`]; uncovered codes are reported as
/// [`Error::UnapprovedWarnings`] in first-seen order, without repeats.
pub fn can_approve(approved_codes: &[String], warnings: &str) -> Result<()> {
    let codes = classify(warnings)?;
    if codes.is_empty() {
        return Ok(());
    }

    let approved: HashSet<&str> = approved_codes.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let missing: Vec<String> = codes
        .into_iter()
        .filter(|code| !approved.contains(code))
        .filter(|code| seen.insert(*code))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        debug!("All warnings are covered by the auto-approve list");
        return Ok(());
    }

    warn!("Warnings not covered by the auto-approve list: {}", missing.join(", "));
    Err(Error::UnapprovedWarnings(missing))
}

/// How a workflow responds to warnings raised by the remote system
#[derive(Debug, Clone, Copy)]
pub struct WarningPolicy<'a> {
    /// Acknowledge whatever was raised
    acknowledge_all: bool,
    /// Codes that may be acknowledged automatically
    approved_codes: &'a [String],
}

impl<'a> WarningPolicy<'a> {
    /// Create a new warning policy
    pub fn new(acknowledge_all: bool, approved_codes: &'a [String]) -> Self {
        Self {
            acknowledge_all,
            approved_codes,
        }
    }

    /// Decide whether `warnings` may be acknowledged
    pub fn evaluate(&self, warnings: &str) -> Result<()> {
        if self.acknowledge_all {
            debug!("Acknowledging warnings unconditionally");
            return Ok(());
        }
        can_approve(self.approved_codes, warnings)
    }
}
