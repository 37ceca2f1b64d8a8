use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::common::RecordId;

/// Per-record outcomes kept in a [`BatchSummary`]; counts stay exact past it.
pub const MAX_REPORTED_OUTCOMES: usize = 50;

// ============================================================================
// Sweep
// ============================================================================

/// A record the sweep flagged, with the schedule it consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedRecord {
    pub id: RecordId,
    pub previous_scheduled_refresh_at: DateTime<Utc>,
}

/// A candidate the sweep refused to touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// `None` when the store returned a row without an identifier.
    pub id: Option<RecordId>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub flagged: Vec<FlaggedRecord>,
    pub skipped: Vec<SkippedRecord>,
    /// Candidates that were edited or flagged elsewhere between read and write.
    pub already_handled: usize,
}

impl SweepReport {
    pub fn flagged_ids(&self) -> Vec<RecordId> {
        self.flagged.iter().map(|f| f.id).collect()
    }
}

// ============================================================================
// Batch
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    /// Content was generated but another writer advanced the record first.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub record_id: RecordId,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_version: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordOutcome {
    pub fn succeeded(record_id: RecordId, content_version: i32) -> Self {
        Self {
            record_id,
            status: OutcomeStatus::Succeeded,
            content_version: Some(content_version),
            error: None,
        }
    }

    pub fn failed(record_id: RecordId, error: impl Into<String>) -> Self {
        Self {
            record_id,
            status: OutcomeStatus::Failed,
            content_version: None,
            error: Some(error.into()),
        }
    }

    pub fn superseded(record_id: RecordId) -> Self {
        Self {
            record_id,
            status: OutcomeStatus::Superseded,
            content_version: None,
            error: None,
        }
    }
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub superseded: usize,
    pub outcomes: Vec<RecordOutcome>,
    pub outcomes_truncated: bool,
}

impl BatchSummary {
    /// Count an outcome and keep it if there is room in the outcome list.
    pub fn record(&mut self, outcome: RecordOutcome) {
        self.attempted += 1;
        match outcome.status {
            OutcomeStatus::Succeeded => self.succeeded += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::Superseded => self.superseded += 1,
        }

        if self.outcomes.len() < MAX_REPORTED_OUTCOMES {
            self.outcomes.push(outcome);
        } else {
            self.outcomes_truncated = true;
        }
    }

    pub fn outcome_for(&self, record_id: RecordId) -> Option<&RecordOutcome> {
        self.outcomes.iter().find(|o| o.record_id == record_id)
    }
}

// ============================================================================
// Cycle
// ============================================================================

/// What the external trigger gets back from one sweep + batch pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub sweep: SweepReport,
    pub batch: BatchSummary,
    pub elapsed_ms: u64,
}
