use tracing::info;

use crate::cps::{ChangeRef, Enrollment, EnrollmentLocation};
use crate::error::Error;
use crate::types::Result;
use crate::workflow::context::WaitContext;
use crate::workflow::poller::ChangePoller;
use crate::workflow::verification::{await_change_verification, VerificationOptions, VerificationOutcome};

/// Result of creating or updating an enrollment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentRef {
    /// Enrollment ID
    pub enrollment_id: i64,
    /// Change started by the call, if any
    pub change_id: Option<i64>,
    /// Milestone the change reached
    pub outcome: VerificationOutcome,
}

/// Create an enrollment under `contract_id` and drive its first change to a milestone
pub async fn create_enrollment(
    ctx: &WaitContext,
    poller: &ChangePoller<'_>,
    contract_id: &str,
    enrollment: &Enrollment,
    options: &VerificationOptions,
) -> Result<EnrollmentRef> {
    let location = poller
        .client()
        .create_enrollment(contract_id, enrollment)
        .await
        .map_err(|e| Error::remote("could not create enrollment", e))?;
    info!("Created enrollment {} under contract {}", location.enrollment, contract_id);

    follow_location(ctx, poller, &location, options).await
}

/// Update an enrollment and drive the resulting change, if any, to a milestone
pub async fn update_enrollment(
    ctx: &WaitContext,
    poller: &ChangePoller<'_>,
    enrollment_id: i64,
    enrollment: &Enrollment,
    allow_cancel_pending_changes: bool,
    options: &VerificationOptions,
) -> Result<EnrollmentRef> {
    let location = poller
        .client()
        .update_enrollment(enrollment_id, enrollment, allow_cancel_pending_changes)
        .await
        .map_err(|e| Error::remote("could not update enrollment", e))?;
    info!("Updated enrollment {}", enrollment_id);

    follow_location(ctx, poller, &location, options).await
}

async fn follow_location(
    ctx: &WaitContext,
    poller: &ChangePoller<'_>,
    location: &EnrollmentLocation,
    options: &VerificationOptions,
) -> Result<EnrollmentRef> {
    let enrollment_id = location.enrollment_id()?;
    let change_id = location.change_id()?;

    let outcome = match change_id {
        Some(change_id) => {
            await_change_verification(ctx, poller, ChangeRef::new(enrollment_id, change_id), options).await?
        }
        None => VerificationOutcome::Stable,
    };

    Ok(EnrollmentRef {
        enrollment_id,
        change_id,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cps::mock::{Call, MockCpsClient, Operation};
    use crate::cps::{ChangeStatus, InputType, Status};

    fn location(changes: &[&str]) -> EnrollmentLocation {
        EnrollmentLocation {
            enrollment: "/cps/v2/enrollments/42".into(),
            changes: changes.iter().map(|change| change.to_string()).collect(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_follows_new_change() {
        let mock = MockCpsClient::new()
            .with_location(location(&["/cps/v2/enrollments/42/changes/9"]))
            .with_statuses(vec![
                ChangeStatus::with_status(Status::PreVerificationSafetyChecks),
                ChangeStatus::with_status(Status::CoordinateDomainValidation)
                    .allowing(InputType::LetsEncryptChallenges),
            ]);
        let poller = ChangePoller::new(&mock);

        let created = create_enrollment(
            &WaitContext::new(),
            &poller,
            "ctr_1-ABC",
            &Enrollment::default(),
            &VerificationOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            created,
            EnrollmentRef {
                enrollment_id: 42,
                change_id: Some(9),
                outcome: VerificationOutcome::DomainValidation,
            }
        );
        assert_eq!(
            mock.calls()[..2],
            [
                Call::CreateEnrollment { contract_id: "ctr_1-ABC".into() },
                Call::GetChangeStatus(ChangeRef::new(42, 9)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_without_change_is_stable() {
        let mock = MockCpsClient::new().with_location(location(&[]));
        let poller = ChangePoller::new(&mock);

        let updated = update_enrollment(
            &WaitContext::new(),
            &poller,
            42,
            &Enrollment::default(),
            true,
            &VerificationOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(updated.change_id, None);
        assert_eq!(updated.outcome, VerificationOutcome::Stable);
        assert_eq!(
            mock.calls(),
            vec![Call::UpdateEnrollment {
                enrollment_id: 42,
                allow_cancel_pending_changes: true
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_names_stage() {
        let mock = MockCpsClient::new().failing(Operation::CreateEnrollment, "invalid contract");
        let poller = ChangePoller::new(&mock);

        let err = create_enrollment(
            &WaitContext::new(),
            &poller,
            "ctr_1-ABC",
            &Enrollment::default(),
            &VerificationOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().starts_with("could not create enrollment"));
        assert_eq!(mock.count(Operation::GetChangeStatus), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_location_is_reported() {
        let mock = MockCpsClient::new().with_location(EnrollmentLocation {
            enrollment: "/cps/v2/enrollments/unknown".into(),
            changes: Vec::new(),
        });
        let poller = ChangePoller::new(&mock);

        let err = create_enrollment(
            &WaitContext::new(),
            &poller,
            "ctr_1-ABC",
            &Enrollment::default(),
            &VerificationOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::InvalidLocation(_)));
    }
}
