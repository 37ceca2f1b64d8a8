//! Refresh domain - keeps generated product content fresh after edits.
//!
//! ```text
//! edit ──► scheduled_refresh_at = now
//!             │ (cooldown)
//! sweep ─────►│ content_version = 0, schedule cleared
//!             │
//! run_batch ──► generate (with backoff) ──► commit if still version 0
//! ```

pub mod activities;
pub mod error;
pub mod generator;
pub mod models;
pub mod settings;
pub mod store;

pub use activities::{refresh_cycle, run_batch, run_refresh_cycle, sweep};
pub use error::RefreshError;
pub use generator::{ContentGenerator, ResearchContentGenerator};
pub use models::{
    cooldown_cutoff, BatchSummary, CooldownState, CycleSummary, FlaggedRecord, GeneratedContent,
    OutcomeStatus, RecordOutcome, RefreshableRecord, SkippedRecord, SweepReport,
    MAX_REPORTED_OUTCOMES, STALE_CONTENT_VERSION,
};
pub use settings::RefreshSettings;
pub use store::{InMemoryRecordStore, PostgresRecordStore, RecordStore};
