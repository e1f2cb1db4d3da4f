use tracing::{debug, info};

use crate::cps::{CertificateMaterial, ChangeRef, ChangeStatus, CpsClient, InputType, Status};
use crate::error::Error;
use crate::types::Result;
use crate::warnings::WarningPolicy;
use crate::workflow::context::WaitContext;
use crate::workflow::poller::ChangePoller;

/// How an upload proceeds once the certificate has been verified
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Sign off change management once it is pending
    pub acknowledge_change_management: bool,
    /// Wait for the change to reach its deployment gate or finish
    pub wait_for_deployment: bool,
    /// Acknowledge any post-verification warnings
    pub acknowledge_post_verification_warnings: bool,
    /// Warning codes acknowledged without operator review
    pub auto_approve_warnings: Vec<String>,
}

/// Reject material sets the remote system cannot accept
pub fn validate_materials(materials: &[CertificateMaterial]) -> Result<()> {
    for material in materials {
        if material.has_trust_chain() && !material.has_certificate() {
            return Err(Error::InvalidMaterial(format!(
                "trust chain for {} was provided without a certificate",
                material.key_algorithm
            )));
        }
    }
    Ok(())
}

/// Upload third-party certificates to the enrollment's pending change
///
/// Waits out certificate verification, reviews post-verification
/// warnings and then handles change management according to `options`.
pub async fn upload(
    ctx: &WaitContext,
    poller: &ChangePoller<'_>,
    enrollment_id: i64,
    materials: &[CertificateMaterial],
    options: &UploadOptions,
) -> Result<()> {
    validate_materials(materials)?;
    let client = poller.client();

    let enrollment = client
        .get_enrollment(enrollment_id)
        .await
        .map_err(|e| Error::remote("could not get enrollment", e))?;
    let change_id = enrollment
        .pending_change_id()?
        .ok_or(Error::NoPendingChange(enrollment_id))?;
    let change = ChangeRef::new(enrollment_id, change_id);

    client
        .upload_certificate_and_trust_chain(change, materials)
        .await
        .map_err(|e| Error::remote("could not upload certificate and trust chain", e))?;
    info!("{}: uploaded {} certificate(s)", change, materials.len());

    let verified = poller
        .wait_until_status_leaves(ctx, change, &Status::VerifyThirdPartyCert)
        .await?;

    if needs_review(&verified) {
        let policy = WarningPolicy::new(
            options.acknowledge_post_verification_warnings,
            &options.auto_approve_warnings,
        );
        acknowledge_post_verification_warnings(client, change, &policy).await?;
        poller
            .wait_until_status_leaves(ctx, change, &Status::WaitReviewThirdPartyCert)
            .await?;
    }

    if enrollment.change_management {
        if !options.acknowledge_change_management && !options.wait_for_deployment {
            debug!("{}: leaving change management to the operator", change);
            return Ok(());
        }
        poller
            .wait_for_status(ctx, change, &Status::WaitAckChangeManagement)
            .await?;
        if !options.acknowledge_change_management {
            info!("{}: change management pending, not acknowledging", change);
            return Ok(());
        }

        client
            .acknowledge_change_management(change)
            .await
            .map_err(|e| Error::remote("could not acknowledge change management", e))?;
        info!("{}: change management acknowledged", change);

        if options.wait_for_deployment {
            poller.wait_for_status(ctx, change, &Status::Complete).await?;
            info!("{}: deployment complete", change);
        }
    } else if options.wait_for_deployment {
        poller.wait_for_status(ctx, change, &Status::Complete).await?;
        info!("{}: deployment complete", change);
    }

    Ok(())
}

fn needs_review(change: &ChangeStatus) -> bool {
    change.is(&Status::WaitReviewThirdPartyCert) || change.allows(&InputType::PostVerificationWarningsAck)
}

async fn acknowledge_post_verification_warnings(
    client: &dyn CpsClient,
    change: ChangeRef,
    policy: &WarningPolicy<'_>,
) -> Result<()> {
    let warnings = client
        .get_post_verification_warnings(change)
        .await
        .map_err(|e| Error::remote("could not get post-verification warnings", e))?;

    if let Err(err) = policy.evaluate(&warnings.warnings) {
        return Err(Error::PostVerificationWarningsNotApproved {
            warnings: warnings.warnings,
            source: Box::new(err),
        });
    }

    client
        .acknowledge_post_verification_warnings(change)
        .await
        .map_err(|e| Error::remote("could not acknowledge post-verification warnings", e))?;
    info!("{}: post-verification warnings acknowledged", change);

    Ok(())
}
