//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (REFRESH_CRON, default every 15 minutes)
//!     │
//!     └─► run_refresh_cycle()
//!             ├─► sweep: flag records whose cooldown elapsed
//!             └─► run_batch: regenerate flagged records
//! ```
//!
//! The HTTP trigger and `refresh_cli` call the same cycle; overlapping
//! invocations in this process are rejected rather than queued.

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::refresh::{run_refresh_cycle, RefreshError};
use crate::kernel::ServerDeps;

/// Start the periodic refresh cycle on `schedule` (6-field cron with seconds).
pub async fn start_scheduler(deps: ServerDeps, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let refresh_job = Job::new_async(schedule, move |_uuid, _lock| {
        let deps = deps.clone();
        Box::pin(async move {
            run_scheduled_refresh(&deps).await;
        })
    })?;

    scheduler.add(refresh_job).await?;
    scheduler.start().await?;

    tracing::info!(schedule, "Scheduled tasks started (content refresh cycle)");
    Ok(scheduler)
}

/// Run one cycle and log the result; scheduled runs have no caller to report to.
async fn run_scheduled_refresh(deps: &ServerDeps) {
    match run_refresh_cycle(deps, None).await {
        Ok(summary) => {
            tracing::info!(
                flagged = summary.sweep.flagged.len(),
                succeeded = summary.batch.succeeded,
                failed = summary.batch.failed,
                "Scheduled refresh cycle finished"
            );
        }
        Err(RefreshError::AlreadyRunning) => {
            tracing::info!("Skipping scheduled refresh, previous cycle still running");
        }
        Err(e) => {
            tracing::error!(error = %e, "Scheduled refresh cycle failed");
        }
    }
}
