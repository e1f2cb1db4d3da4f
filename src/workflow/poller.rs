use std::time::Duration;
use tracing::debug;

use crate::cps::{ChangeRef, ChangeStatus, CpsClient, Status};
use crate::error::Error;
use crate::types::Result;
use crate::workflow::context::WaitContext;

/// Default delay between change status fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Interval-based wait on a remote change
///
/// Every wait fetches once immediately, then sleeps one interval between
/// fetches. Sleeps end early when the context ends; fetches are never
/// retried.
#[derive(Clone, Copy)]
pub struct ChangePoller<'a> {
    /// Remote client
    client: &'a dyn CpsClient,
    /// Delay between fetches
    interval: Duration,
}

impl<'a> ChangePoller<'a> {
    /// Create a poller using the default interval
    pub fn new(client: &'a dyn CpsClient) -> Self {
        Self {
            client,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Remote client
    pub fn client(&self) -> &'a dyn CpsClient {
        self.client
    }

    /// Poll interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch the change once
    pub async fn fetch(&self, change: ChangeRef) -> Result<ChangeStatus> {
        let status = self
            .client
            .get_change_status(change)
            .await
            .map_err(|e| Error::remote("could not get change status", e))?;
        debug!("{}: status '{}'", change, status.status_label());
        Ok(status)
    }

    /// Sleep one interval, failing with the last observed status if the context ends
    pub async fn pause(&self, ctx: &WaitContext, last: &ChangeStatus) -> Result<()> {
        ctx.sleep(self.interval).await.map_err(|reason| Error::Timeout {
            status: last.status_label(),
            reason,
        })
    }

    /// Poll until `done` accepts the change status
    ///
    /// A change reporting a remote error aborts the wait.
    pub async fn wait_until<F>(&self, ctx: &WaitContext, change: ChangeRef, mut done: F) -> Result<ChangeStatus>
    where
        F: FnMut(&ChangeStatus) -> bool + Send,
    {
        let mut current = self.fetch(change).await?;
        loop {
            current.ensure_not_failed()?;
            if done(&current) {
                return Ok(current);
            }
            self.pause(ctx, &current).await?;
            current = self.fetch(change).await?;
        }
    }

    /// Poll until the change reaches `target`
    pub async fn wait_for_status(&self, ctx: &WaitContext, change: ChangeRef, target: &Status) -> Result<ChangeStatus> {
        debug!("{}: waiting for status '{}'", change, target);
        self.wait_until(ctx, change, |status| status.is(target)).await
    }

    /// Poll while the change sits in `transient`; returns the first other status
    pub async fn wait_until_status_leaves(
        &self,
        ctx: &WaitContext,
        change: ChangeRef,
        transient: &Status,
    ) -> Result<ChangeStatus> {
        debug!("{}: waiting for status to leave '{}'", change, transient);
        self.wait_until(ctx, change, |status| {
            status.status().map_or(false, |current| current != transient)
        })
        .await
    }
}
