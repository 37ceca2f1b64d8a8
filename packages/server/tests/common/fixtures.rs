//! Record fixtures shared by the integration tests.

use chrono::{DateTime, SubsecRound, Utc};

use refresh_core::domains::refresh::{GeneratedContent, RefreshableRecord};

/// Current time at the precision Postgres stores, so round-trips compare equal.
pub fn db_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A record with current content and no pending edit.
pub fn fresh_record(name: &str, version: i32) -> RefreshableRecord {
    RefreshableRecord::builder()
        .name(name)
        .website_url(format!("https://{}.example.com", name.to_lowercase()))
        .content_version(version)
        .generated_content(content(&format!("{} summary", name)))
        .build()
}

/// A record edited at `edited_at` and still waiting out its cooldown.
pub fn edited_record(name: &str, edited_at: DateTime<Utc>) -> RefreshableRecord {
    let mut record = fresh_record(name, 1);
    record.apply_edit(edited_at);
    record
}

/// A record already flagged for regeneration.
pub fn flagged_record(name: &str, flagged_at: DateTime<Utc>) -> RefreshableRecord {
    let mut record = fresh_record(name, 1);
    record.apply_flag(flagged_at);
    record
}

pub fn content(summary: &str) -> GeneratedContent {
    GeneratedContent {
        summary: summary.to_string(),
        highlights: vec![],
        sources: vec![],
        model: Some("test-model".to_string()),
        generated_at: Utc::now(),
    }
}
