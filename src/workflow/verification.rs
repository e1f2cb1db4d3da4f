use tracing::{debug, info};

use crate::cps::{ChangeRef, ChangeStatus, CpsClient, InputType, Status};
use crate::error::Error;
use crate::types::Result;
use crate::warnings::WarningPolicy;
use crate::workflow::context::WaitContext;
use crate::workflow::poller::ChangePoller;

/// How pre-verification warnings are handled
#[derive(Debug, Clone, Default)]
pub struct VerificationOptions {
    /// Acknowledge any pre-verification warnings
    pub acknowledge_warnings: bool,
    /// Warning codes acknowledged without operator review
    pub auto_approve_warnings: Vec<String>,
}

/// Milestone at which verification hands control back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Waiting for domain validation challenges to be fulfilled
    DomainValidation,
    /// Waiting for a third-party certificate upload
    ThirdPartyUpload,
    /// Waiting for some other operator input
    AwaitingInput(Vec<InputType>),
    /// Nothing in flight
    Stable,
}

enum Progress {
    WarningsReview,
    Reached(VerificationOutcome),
    Pending,
}

fn progress(change: &ChangeStatus) -> Progress {
    if change.allows(&InputType::PreVerificationWarningsAck)
        || change.is(&Status::WaitReviewPreVerificationSafetyChecks)
    {
        return Progress::WarningsReview;
    }
    if change.allows(&InputType::LetsEncryptChallenges) || change.is(&Status::CoordinateDomainValidation) {
        return Progress::Reached(VerificationOutcome::DomainValidation);
    }
    if change.allows(&InputType::ThirdPartyCertificate)
        || change.allows(&InputType::ThirdPartyCsr)
        || change.is(&Status::WaitUploadThirdParty)
    {
        return Progress::Reached(VerificationOutcome::ThirdPartyUpload);
    }
    if !change.allowed_input.is_empty() {
        let inputs = change.allowed_input.iter().map(|input| input.input_type.clone()).collect();
        return Progress::Reached(VerificationOutcome::AwaitingInput(inputs));
    }
    if change.is(&Status::Complete) {
        return Progress::Reached(VerificationOutcome::Stable);
    }
    Progress::Pending
}

/// Drive the enrollment's pending change to its next awaiting-input milestone
///
/// An enrollment without a pending change is already stable.
pub async fn await_verification(
    ctx: &WaitContext,
    poller: &ChangePoller<'_>,
    enrollment_id: i64,
    options: &VerificationOptions,
) -> Result<VerificationOutcome> {
    let enrollment = poller
        .client()
        .get_enrollment(enrollment_id)
        .await
        .map_err(|e| Error::remote("could not get enrollment", e))?;

    match enrollment.pending_change_id()? {
        Some(change_id) => {
            await_change_verification(ctx, poller, ChangeRef::new(enrollment_id, change_id), options).await
        }
        None => {
            info!("Enrollment {} has no pending change", enrollment_id);
            Ok(VerificationOutcome::Stable)
        }
    }
}

/// Drive a known change to its next awaiting-input milestone
///
/// Pre-verification warnings are acknowledged when `options` allow it;
/// otherwise the wait fails with the raw warning text.
pub async fn await_change_verification(
    ctx: &WaitContext,
    poller: &ChangePoller<'_>,
    change: ChangeRef,
    options: &VerificationOptions,
) -> Result<VerificationOutcome> {
    let policy = WarningPolicy::new(options.acknowledge_warnings, &options.auto_approve_warnings);
    let mut current = poller.fetch(change).await?;

    loop {
        current.ensure_not_failed()?;
        match progress(&current) {
            Progress::WarningsReview => {
                acknowledge_pre_verification_warnings(poller.client(), change, &policy).await?;
            }
            Progress::Reached(outcome) => {
                info!("{}: verification reached {:?} in status '{}'", change, outcome, current.status_label());
                return Ok(outcome);
            }
            Progress::Pending => {
                debug!("{}: verification still in progress", change);
            }
        }

        poller.pause(ctx, &current).await?;
        current = poller.fetch(change).await?;
    }
}

async fn acknowledge_pre_verification_warnings(
    client: &dyn CpsClient,
    change: ChangeRef,
    policy: &WarningPolicy<'_>,
) -> Result<()> {
    let warnings = client
        .get_pre_verification_warnings(change)
        .await
        .map_err(|e| Error::remote("could not get pre-verification warnings", e))?;

    if let Err(err) = policy.evaluate(&warnings.warnings) {
        return Err(Error::WarningsNotAcknowledged {
            warnings: warnings.warnings,
            source: Box::new(err),
        });
    }

    client
        .acknowledge_pre_verification_warnings(change)
        .await
        .map_err(|e| Error::remote("could not acknowledge pre-verification warnings", e))?;
    info!("{}: pre-verification warnings acknowledged", change);

    Ok(())
}
