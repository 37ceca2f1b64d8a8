//! Refresh cycle - the entry point periodic triggers call.
//!
//! One cycle is a cooldown sweep followed by a batch run, bounded by the
//! configured wall-clock budget. Callers: the in-process cron job, the
//! `POST /internal/refresh` route and `refresh_cli cycle`.

use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{info, warn};

use super::{run_batch, sweep};
use crate::domains::refresh::error::RefreshError;
use crate::domains::refresh::generator::ContentGenerator;
use crate::domains::refresh::models::CycleSummary;
use crate::domains::refresh::settings::RefreshSettings;
use crate::domains::refresh::store::RecordStore;
use crate::kernel::ServerDeps;

/// Run one sweep + batch pass against the wired dependencies.
///
/// `limit` overrides the configured batch limit. Refuses to start while
/// another cycle in this process is still running.
pub async fn run_refresh_cycle(
    deps: &ServerDeps,
    limit: Option<usize>,
) -> Result<CycleSummary, RefreshError> {
    let _guard = deps
        .try_begin_cycle()
        .ok_or(RefreshError::AlreadyRunning)?;

    refresh_cycle(
        deps.store.as_ref(),
        deps.generator.as_ref(),
        &deps.settings,
        limit,
        Utc::now(),
    )
    .await
}

/// Sweep then regenerate, as of `now`, within `settings.cycle_timeout`.
///
/// On timeout the in-flight record is simply left for the next cycle: its
/// commit is a single conditional update that either happened or didn't.
pub async fn refresh_cycle(
    store: &dyn RecordStore,
    generator: &dyn ContentGenerator,
    settings: &RefreshSettings,
    limit: Option<usize>,
    now: DateTime<Utc>,
) -> Result<CycleSummary, RefreshError> {
    let limit = limit.unwrap_or(settings.batch_limit);
    let started = Instant::now();

    info!(
        cooldown_secs = settings.cooldown.as_secs(),
        limit,
        "Refresh cycle starting"
    );

    let work = async {
        let sweep_report = sweep(store, settings.cooldown, now).await?;
        let batch = run_batch(store, generator, limit, &settings.backoff, now).await?;
        Ok::<_, RefreshError>((sweep_report, batch))
    };

    let (sweep_report, batch) = match tokio::time::timeout(settings.cycle_timeout, work).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(
                budget_secs = settings.cycle_timeout.as_secs(),
                "Refresh cycle timed out"
            );
            return Err(RefreshError::TimedOut(settings.cycle_timeout));
        }
    };

    let summary = CycleSummary {
        started_at: now,
        sweep: sweep_report,
        batch,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    info!(
        flagged = summary.sweep.flagged.len(),
        attempted = summary.batch.attempted,
        succeeded = summary.batch.succeeded,
        failed = summary.batch.failed,
        elapsed_ms = summary.elapsed_ms,
        "Refresh cycle complete"
    );

    Ok(summary)
}
