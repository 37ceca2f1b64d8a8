use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::RecordStore;
use crate::common::RecordId;
use crate::domains::refresh::models::{GeneratedContent, RefreshableRecord};

/// Process-local record store.
///
/// Used by tests and local scenarios. Applies the same guards as
/// the Postgres store, each under one lock acquisition.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<RecordId, RefreshableRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = RefreshableRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.lock().unwrap();
            for record in records {
                map.insert(record.id, record);
            }
        }
        store
    }

    /// Make every subsequent call fail, simulating a store outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of a record, bypassing the outage switch.
    pub fn get(&self, id: RecordId) -> Option<RefreshableRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("in-memory record store is unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_records_with_expired_cooldown(
        &self,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<Vec<RefreshableRecord>> {
        self.check_available()?;
        let records = self.records.lock().unwrap();

        let mut expired: Vec<RefreshableRecord> = records
            .values()
            .filter(|r| r.cooldown_expired(now, cooldown))
            .cloned()
            .collect();
        expired.sort_by_key(|r| (r.scheduled_refresh_at, r.id));
        Ok(expired)
    }

    async fn flag_for_refresh(
        &self,
        id: RecordId,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<bool> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();

        match records.get_mut(&id) {
            Some(record) if record.cooldown_expired(now, cooldown) => {
                record.apply_flag(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_flagged(&self, limit: usize) -> Result<Vec<RefreshableRecord>> {
        self.check_available()?;
        let records = self.records.lock().unwrap();

        let mut flagged: Vec<RefreshableRecord> =
            records.values().filter(|r| r.is_stale()).cloned().collect();
        // Option orders None first, matching NULLS FIRST in Postgres
        flagged.sort_by_key(|r| (r.flagged_at, r.id));
        flagged.truncate(limit);
        Ok(flagged)
    }

    async fn commit_generated_content(
        &self,
        id: RecordId,
        content: &GeneratedContent,
        expected_prior_version: i32,
    ) -> Result<bool> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();

        Ok(records
            .get_mut(&id)
            .is_some_and(|record| record.apply_generated_content(content.clone(), expected_prior_version)))
    }

    async fn defer_failed(&self, id: RecordId, now: DateTime<Utc>) -> Result<bool> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();

        match records.get_mut(&id) {
            Some(record) if record.is_stale() => {
                record.flagged_at = Some(record.flagged_at.map_or(now, |at| at.max(now)));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_edit(&self, id: RecordId, now: DateTime<Utc>) -> Result<bool> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();

        match records.get_mut(&id) {
            Some(record) => {
                record.apply_edit(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<RefreshableRecord>> {
        self.check_available()?;
        Ok(self.get(id))
    }

    async fn insert(&self, record: &RefreshableRecord) -> Result<()> {
        self.check_available()?;
        let mut records = self.records.lock().unwrap();

        if records.contains_key(&record.id) {
            bail!("record {} already exists", record.id);
        }
        records.insert(record.id, record.clone());
        Ok(())
    }
}
