//! Cooldown sweep - turns quiet edits into refresh flags.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domains::refresh::error::RefreshError;
use crate::domains::refresh::models::{FlaggedRecord, SkippedRecord, SweepReport};
use crate::domains::refresh::store::RecordStore;

/// Flag every record whose last edit has been quiet for `cooldown` at `now`.
///
/// Running it twice at the same `now` flags nothing the second time, since
/// flagging clears the schedule. Inconsistent candidates are skipped and
/// reported; only store failures abort the sweep.
pub async fn sweep(
    store: &dyn RecordStore,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> Result<SweepReport, RefreshError> {
    let candidates = store
        .find_records_with_expired_cooldown(now, cooldown)
        .await
        .map_err(RefreshError::Store)?;

    debug!(candidates = candidates.len(), "Cooldown sweep candidates loaded");

    let mut report = SweepReport::default();

    for candidate in candidates {
        if candidate.id.is_nil() {
            warn!(name = %candidate.name, "Skipping sweep candidate without an identifier");
            report.skipped.push(SkippedRecord {
                id: None,
                reason: "record has no identifier".to_string(),
            });
            continue;
        }

        let Some(previous) = candidate.scheduled_refresh_at else {
            warn!(record_id = %candidate.id, "Skipping sweep candidate without a scheduled refresh");
            report.skipped.push(SkippedRecord {
                id: Some(candidate.id),
                reason: "no scheduled refresh".to_string(),
            });
            continue;
        };

        if !candidate.cooldown_expired(now, cooldown) {
            warn!(
                record_id = %candidate.id,
                scheduled_refresh_at = %previous,
                "Skipping sweep candidate whose cooldown has not elapsed"
            );
            report.skipped.push(SkippedRecord {
                id: Some(candidate.id),
                reason: format!("cooldown has not elapsed (scheduled {})", previous),
            });
            continue;
        }

        let flagged = store
            .flag_for_refresh(candidate.id, now, cooldown)
            .await
            .map_err(RefreshError::Store)?;

        if flagged {
            info!(
                record_id = %candidate.id,
                previous_scheduled_refresh_at = %previous,
                "Flagged record for refresh"
            );
            report.flagged.push(FlaggedRecord {
                id: candidate.id,
                previous_scheduled_refresh_at: previous,
            });
        } else {
            debug!(record_id = %candidate.id, "Record changed before it could be flagged");
            report.already_handled += 1;
        }
    }

    info!(
        flagged = report.flagged.len(),
        skipped = report.skipped.len(),
        already_handled = report.already_handled,
        "Cooldown sweep complete"
    );

    Ok(report)
}
