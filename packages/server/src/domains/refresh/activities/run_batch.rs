//! Batch enrichment - regenerate content for flagged records.
//!
//! ```text
//! find_flagged(limit)
//!     │
//!     └─► for each record (sequential)
//!             ├─► backoff::execute(generator.generate)
//!             │       ├─► Ok  → commit_generated_content(expected = 0)
//!             │       │           ├─► true  → succeeded
//!             │       │           └─► false → superseded
//!             │       └─► Err → failed: defer_failed(now), record stays stale
//!             │                 but moves behind the rest of the queue
//!             └─► summary.record(outcome)
//! ```

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domains::refresh::error::RefreshError;
use crate::domains::refresh::generator::ContentGenerator;
use crate::domains::refresh::models::{BatchSummary, RecordOutcome, STALE_CONTENT_VERSION};
use crate::domains::refresh::store::RecordStore;
use crate::kernel::backoff::{self, BackoffConfig};

/// Regenerate up to `limit` flagged records, one at a time.
///
/// A record whose generation keeps failing is reported and left stale, with
/// its flag time moved to `now` so later runs reach the records queued
/// behind it. Store failures abort the batch.
pub async fn run_batch(
    store: &dyn RecordStore,
    generator: &dyn ContentGenerator,
    limit: usize,
    backoff_config: &BackoffConfig,
    now: DateTime<Utc>,
) -> Result<BatchSummary, RefreshError> {
    let records = store
        .find_flagged(limit)
        .await
        .map_err(RefreshError::Store)?;

    info!(count = records.len(), limit, "Starting batch enrichment run");

    let mut summary = BatchSummary::default();

    for record in records {
        let label = record.id.to_string();
        let generated =
            backoff::execute(|| generator.generate(&record), &label, backoff_config).await;

        let outcome = match generated {
            Ok(content) => {
                let committed = store
                    .commit_generated_content(record.id, &content, STALE_CONTENT_VERSION)
                    .await
                    .map_err(RefreshError::Store)?;

                if committed {
                    info!(record_id = %record.id, name = %record.name, "Regenerated content");
                    RecordOutcome::succeeded(record.id, STALE_CONTENT_VERSION + 1)
                } else {
                    info!(
                        record_id = %record.id,
                        "Discarding generated content, record was updated concurrently"
                    );
                    RecordOutcome::superseded(record.id)
                }
            }
            Err(e) => {
                warn!(
                    record_id = %record.id,
                    name = %record.name,
                    error = %e,
                    "Content generation failed after retries, leaving record flagged"
                );
                store
                    .defer_failed(record.id, now)
                    .await
                    .map_err(RefreshError::Store)?;
                RecordOutcome::failed(record.id, format!("{:#}", e))
            }
        };

        summary.record(outcome);
    }

    info!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        superseded = summary.superseded,
        "Batch enrichment run complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::refresh::models::{OutcomeStatus, RefreshableRecord};
    use crate::domains::refresh::store::InMemoryRecordStore;
    use crate::kernel::test_dependencies::MockContentGenerator;
    use chrono::{Duration as ChronoDuration, Utc};

    fn flagged(name: &str, minutes_ago: i64) -> RefreshableRecord {
        RefreshableRecord::builder()
            .name(name)
            .flagged_at(Utc::now() - ChronoDuration::minutes(minutes_ago))
            .build()
    }

    #[tokio::test]
    async fn failing_records_stay_flagged_while_others_succeed() {
        let records: Vec<_> = (0..5).map(|i| flagged(&format!("p{}", i), 10 - i)).collect();
        let generator = MockContentGenerator::new()
            .failing_for(records[1].id)
            .failing_for(records[3].id);
        let store = InMemoryRecordStore::with_records(records.clone());

        let summary = run_batch(&store, &generator, 10, &BackoffConfig::immediate(3), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 2);
        for failed in [&records[1], &records[3]] {
            let stored = store.get(failed.id).unwrap();
            assert_eq!(stored.content_version, STALE_CONTENT_VERSION);
            assert!(stored.generated_content.is_none());
            assert_eq!(generator.calls_for(failed.id), 3);
        }
        let ok = store.get(records[0].id).unwrap();
        assert_eq!(ok.content_version, 1);
        assert!(ok.flagged_at.is_none());
    }

    #[tokio::test]
    async fn processes_oldest_flag_first_and_respects_limit() {
        let oldest = flagged("oldest", 30);
        let middle = flagged("middle", 20);
        let newest = flagged("newest", 10);
        let store = InMemoryRecordStore::with_records([newest.clone(), oldest.clone(), middle.clone()]);
        let generator = MockContentGenerator::new();

        let summary = run_batch(&store, &generator, 2, &BackoffConfig::immediate(1), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(generator.calls(), vec![oldest.id, middle.id]);
        assert!(store.get(newest.id).unwrap().is_stale());
    }

    #[tokio::test]
    async fn permanent_failures_do_not_starve_records_queued_behind_them() {
        let t = Utc::now();
        let broken_a = RefreshableRecord::builder()
            .name("broken-a")
            .flagged_at(t - ChronoDuration::minutes(30))
            .build();
        let broken_b = RefreshableRecord::builder()
            .name("broken-b")
            .flagged_at(t - ChronoDuration::minutes(20))
            .build();
        let good = RefreshableRecord::builder()
            .name("good")
            .flagged_at(t - ChronoDuration::minutes(10))
            .build();
        let store =
            InMemoryRecordStore::with_records([broken_a.clone(), broken_b.clone(), good.clone()]);
        let generator = MockContentGenerator::new()
            .failing_for(broken_a.id)
            .failing_for(broken_b.id);

        let first = run_batch(&store, &generator, 2, &BackoffConfig::immediate(2), t)
            .await
            .unwrap();
        assert_eq!(first.failed, 2);
        assert_eq!(store.get(broken_a.id).unwrap().flagged_at, Some(t));
        assert_eq!(store.get(broken_b.id).unwrap().flagged_at, Some(t));

        let second = run_batch(
            &store,
            &generator,
            2,
            &BackoffConfig::immediate(2),
            t + ChronoDuration::minutes(15),
        )
        .await
        .unwrap();

        assert_eq!(second.attempted, 2);
        assert_eq!(second.succeeded, 1);
        assert_eq!(generator.calls_for(good.id), 1);
        let stored = store.get(good.id).unwrap();
        assert_eq!(stored.content_version, 1);
        // Failures keep their stale state and prior content
        assert!(store.get(broken_a.id).unwrap().is_stale());
        assert!(store.get(broken_b.id).unwrap().generated_content.is_none());
    }

    #[tokio::test]
    async fn transient_failure_is_retried_to_success() {
        let record = flagged("flaky", 5);
        let store = InMemoryRecordStore::with_records([record.clone()]);
        let generator = MockContentGenerator::new().flaky_for(record.id, 2);

        let summary = run_batch(&store, &generator, 10, &BackoffConfig::immediate(3), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(generator.calls_for(record.id), 3);
        assert_eq!(
            summary.outcome_for(record.id).map(|o| o.status),
            Some(OutcomeStatus::Succeeded)
        );
    }

    #[tokio::test]
    async fn failure_outcome_carries_last_error() {
        let record = flagged("down", 5);
        let store = InMemoryRecordStore::with_records([record.clone()]);
        let generator = MockContentGenerator::new().failing_for(record.id);

        let summary = run_batch(&store, &generator, 10, &BackoffConfig::immediate(2), Utc::now())
            .await
            .unwrap();

        let outcome = summary.outcome_for(record.id).unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.error.as_deref().unwrap().contains("call 2"));
    }

    #[tokio::test]
    async fn store_outage_aborts_batch() {
        let store = InMemoryRecordStore::with_records([flagged("p", 1)]);
        store.set_unavailable(true);

        let result = run_batch(&store, &MockContentGenerator::new(), 10, &BackoffConfig::immediate(1), Utc::now()).await;

        assert!(matches!(result, Err(RefreshError::Store(_))));
    }

    #[tokio::test]
    async fn empty_store_yields_empty_summary() {
        let store = InMemoryRecordStore::new();
        let summary = run_batch(&store, &MockContentGenerator::new(), 10, &BackoffConfig::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(summary, BatchSummary::default());
    }
}
