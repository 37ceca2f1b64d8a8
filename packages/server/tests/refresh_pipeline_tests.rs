//! End-to-end refresh scenarios against the in-memory store.
//!
//! Drives edits, sweeps and batch runs through a simulated clock to check
//! the debounce and regeneration behavior as a whole.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use refresh_core::domains::refresh::{
    refresh_cycle, run_batch, sweep, ContentGenerator, CooldownState, GeneratedContent,
    InMemoryRecordStore, OutcomeStatus, RecordStore, RefreshSettings, RefreshableRecord,
    STALE_CONTENT_VERSION,
};
use refresh_core::kernel::{BackoffConfig, MockContentGenerator};

use crate::common::{content, edited_record, fresh_record};

const COOLDOWN: Duration = Duration::from_secs(3600);

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

fn settings() -> RefreshSettings {
    RefreshSettings {
        cooldown: COOLDOWN,
        backoff: BackoffConfig::immediate(3),
        ..RefreshSettings::default()
    }
}

#[tokio::test]
async fn burst_of_edits_produces_a_single_flag() {
    let record = fresh_record("Lamp", 4);
    let store = InMemoryRecordStore::with_records([record.clone()]);

    // Three edits ten minutes apart, with sweeps running in between
    for (edit, check) in [(0, 300), (600, 900), (1200, 1500)] {
        assert!(store.record_edit(record.id, at(edit)).await.unwrap());
        let report = sweep(&store, COOLDOWN, at(check)).await.unwrap();
        assert!(report.flagged.is_empty());
    }

    // Still cooling down relative to the last edit
    let report = sweep(&store, COOLDOWN, at(1200 + 3599)).await.unwrap();
    assert!(report.flagged.is_empty());
    assert_eq!(
        store.get(record.id).unwrap().cooldown_state(at(1200 + 3599), COOLDOWN),
        CooldownState::CoolingDown {
            ready_at: at(1200 + 3600)
        }
    );

    let report = sweep(&store, COOLDOWN, at(1200 + 3600)).await.unwrap();
    assert_eq!(report.flagged_ids(), vec![record.id]);
    assert_eq!(report.flagged[0].previous_scheduled_refresh_at, at(1200));

    let later = sweep(&store, COOLDOWN, at(10_000)).await.unwrap();
    assert!(later.flagged.is_empty());
}

#[tokio::test]
async fn record_is_flagged_only_once_cooldown_has_passed() {
    let record = edited_record("Chair", t0());
    let store = InMemoryRecordStore::with_records([record.clone()]);
    let generator = MockContentGenerator::new();

    let early = refresh_cycle(&store, &generator, &settings(), None, at(3599))
        .await
        .unwrap();
    assert!(early.sweep.flagged.is_empty());
    assert_eq!(early.batch.attempted, 0);
    assert_eq!(store.get(record.id).unwrap().content_version, 1);

    let report = sweep(&store, COOLDOWN, at(3601)).await.unwrap();
    assert_eq!(report.flagged_ids(), vec![record.id]);

    let stored = store.get(record.id).unwrap();
    assert_eq!(stored.content_version, STALE_CONTENT_VERSION);
    assert!(stored.scheduled_refresh_at.is_none());
    assert_eq!(
        stored.cooldown_state(at(3601), COOLDOWN),
        CooldownState::AwaitingRegeneration
    );

    let summary = run_batch(&store, &generator, 10, &BackoffConfig::immediate(3), at(3601))
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 1);

    let stored = store.get(record.id).unwrap();
    assert_eq!(stored.content_version, 1);
    assert_eq!(
        stored.generated_content.as_ref().unwrap().summary,
        "Generated summary for Chair"
    );
    assert_eq!(stored.cooldown_state(at(3601), COOLDOWN), CooldownState::Idle);
}

#[tokio::test]
async fn permanent_failures_are_isolated_within_a_batch() {
    let records: Vec<RefreshableRecord> = (0..5)
        .map(|i| edited_record(&format!("Product {}", i), at(-(5 - i) * 60)))
        .collect();
    let store = InMemoryRecordStore::with_records(records.clone());
    let generator = MockContentGenerator::new()
        .failing_for(records[1].id)
        .failing_for(records[3].id);

    let summary = refresh_cycle(&store, &generator, &settings(), None, at(7200))
        .await
        .unwrap();

    assert_eq!(summary.sweep.flagged.len(), 5);
    assert_eq!(summary.batch.attempted, 5);
    assert_eq!(summary.batch.succeeded, 3);
    assert_eq!(summary.batch.failed, 2);

    for failed in [&records[1], &records[3]] {
        assert_eq!(store.get(failed.id).unwrap().content_version, STALE_CONTENT_VERSION);
        assert_eq!(generator.calls_for(failed.id), 3);
        let outcome = summary.batch.outcome_for(failed.id).unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Failed);
    }

    // Failed records are picked up again by the next run
    let retry = run_batch(
        &store,
        &MockContentGenerator::new(),
        10,
        &BackoffConfig::immediate(1),
        at(7300),
    )
    .await
    .unwrap();
    assert_eq!(retry.attempted, 2);
    assert_eq!(retry.succeeded, 2);
}

/// Simulates another writer regenerating the record while ours is in flight.
struct RacingGenerator {
    store: Arc<InMemoryRecordStore>,
}

#[async_trait]
impl ContentGenerator for RacingGenerator {
    async fn generate(&self, record: &RefreshableRecord) -> anyhow::Result<GeneratedContent> {
        self.store
            .commit_generated_content(record.id, &content("other writer"), STALE_CONTENT_VERSION)
            .await?;
        Ok(content("slow writer"))
    }
}

#[tokio::test]
async fn losing_the_version_check_reports_superseded() {
    let record = edited_record("Desk", t0());
    let store = Arc::new(InMemoryRecordStore::with_records([record.clone()]));
    sweep(store.as_ref(), COOLDOWN, at(3600)).await.unwrap();

    let generator = RacingGenerator {
        store: store.clone(),
    };
    let summary = run_batch(store.as_ref(), &generator, 10, &BackoffConfig::immediate(1), at(3600))
        .await
        .unwrap();

    assert_eq!(summary.superseded, 1);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(
        summary.outcome_for(record.id).unwrap().status,
        OutcomeStatus::Superseded
    );

    let stored = store.get(record.id).unwrap();
    assert_eq!(stored.content_version, 1);
    assert_eq!(stored.generated_content.unwrap().summary, "other writer");
}

#[tokio::test]
async fn edit_after_flag_schedules_another_refresh() {
    let record = edited_record("Rug", t0());
    let store = InMemoryRecordStore::with_records([record.clone()]);

    sweep(&store, COOLDOWN, at(3600)).await.unwrap();
    store.record_edit(record.id, at(4000)).await.unwrap();
    run_batch(&store, &MockContentGenerator::new(), 10, &BackoffConfig::immediate(1), at(4100))
        .await
        .unwrap();

    let stored = store.get(record.id).unwrap();
    assert_eq!(stored.content_version, 1);
    assert_eq!(stored.scheduled_refresh_at, Some(at(4000)));

    let report = sweep(&store, COOLDOWN, at(4000 + 3600)).await.unwrap();
    assert_eq!(report.flagged_ids(), vec![record.id]);
}
