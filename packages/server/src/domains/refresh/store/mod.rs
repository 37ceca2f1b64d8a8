//! Record store adapter - the narrow interface the pipeline has onto storage.
//!
//! Every write is scoped to a single record and guarded by a condition that
//! is re-checked at write time, so concurrent sweeps, edits and batch runs
//! can interleave without producing a half-refreshed record:
//!
//! - `flag_for_refresh` only fires while the record is still cooled down
//! - `commit_generated_content` only fires while the version still matches
//! - `defer_failed` only touches records that are still stale

mod memory;
mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::common::RecordId;
use crate::domains::refresh::models::{GeneratedContent, RefreshableRecord};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records whose pending edit has been quiet for at least `cooldown`,
    /// oldest schedule first.
    async fn find_records_with_expired_cooldown(
        &self,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<Vec<RefreshableRecord>>;

    /// Set `content_version = 0` and clear the schedule, if the record is
    /// still eligible under the same `now`/`cooldown`.
    ///
    /// Returns true if this call performed the flag.
    async fn flag_for_refresh(
        &self,
        id: RecordId,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<bool>;

    /// Up to `limit` stale records, oldest flag first. Records that were
    /// never generated (no flag time) come before everything else.
    async fn find_flagged(&self, limit: usize) -> Result<Vec<RefreshableRecord>>;

    /// Replace the generated content and bump the version, only if the
    /// stored version still equals `expected_prior_version`.
    ///
    /// Returns false on a version mismatch.
    async fn commit_generated_content(
        &self,
        id: RecordId,
        content: &GeneratedContent,
        expected_prior_version: i32,
    ) -> Result<bool>;

    /// Move a stale record's flag time forward to `now` after its
    /// regeneration failed, so it queues behind records flagged earlier.
    /// Content, version and schedule are left alone; the flag time never
    /// moves backwards.
    ///
    /// Returns false if the record is missing or no longer stale.
    async fn defer_failed(&self, id: RecordId, now: DateTime<Utc>) -> Result<bool>;

    /// Edit write path: stamp `last_edited_at` and restart the cooldown.
    ///
    /// Returns false if the record does not exist.
    async fn record_edit(&self, id: RecordId, now: DateTime<Utc>) -> Result<bool>;

    async fn find_by_id(&self, id: RecordId) -> Result<Option<RefreshableRecord>>;

    async fn insert(&self, record: &RefreshableRecord) -> Result<()>;
}
