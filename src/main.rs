use anyhow::{Context, Result};
use cps_orchestrator::{
    config::{Settings, WorkflowAction},
    cps::create_cps_client,
    telemetry,
    workflow::{await_verification, upload, ChangePoller, WaitContext},
};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env and configuration
    dotenvy::dotenv().ok();
    let settings = Settings::load().context("Failed to load configuration")?;

    // 2. Initialize telemetry
    telemetry::init_logging(&settings)?;
    info!("Starting CPS orchestrator...");

    let enrollment_id = settings
        .workflow
        .enrollment_id
        .context("workflow.enrollment_id must be set")?;

    // 3. Build the remote client and the wait scope
    let client = create_cps_client(&settings)?;
    let poller = ChangePoller::new(client.as_ref()).with_interval(settings.poll_interval());
    let ctx = settings.wait_context(WaitContext::new());

    // 4. Ctrl-C cancels any wait in progress
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received, cancelling...");
            canceller.cancel();
        }
    });

    // 5. Run the configured workflow
    match settings.workflow.action {
        WorkflowAction::Verify => {
            let outcome = await_verification(&ctx, &poller, enrollment_id, &settings.verification_options()).await?;
            info!("Enrollment {} reached {:?}", enrollment_id, outcome);
        }
        WorkflowAction::Upload => {
            let materials = settings.certificate_materials()?;
            upload(&ctx, &poller, enrollment_id, &materials, &settings.upload_options()).await?;
            info!("Enrollment {} certificates uploaded", enrollment_id);
        }
    }

    Ok(())
}
