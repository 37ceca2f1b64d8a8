use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use typed_builder::TypedBuilder;

use crate::common::RecordId;

/// `content_version` value meaning "stale, regenerate me".
pub const STALE_CONTENT_VERSION: i32 = 0;

/// A product record whose generated content is kept fresh by the pipeline.
///
/// `scheduled_refresh_at` is the debounce clock: every edit pushes it to the
/// edit time, and the record only becomes flaggable once it has sat still for
/// a full cooldown. Flagging drops `content_version` to
/// [`STALE_CONTENT_VERSION`]; a successful regeneration bumps it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct RefreshableRecord {
    #[builder(default = RecordId::new())]
    pub id: RecordId,

    // Generation inputs
    pub name: String,
    #[builder(default, setter(strip_option))]
    pub website_url: Option<String>,

    // Debounce state
    #[builder(default, setter(strip_option))]
    pub last_edited_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub scheduled_refresh_at: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub flagged_at: Option<DateTime<Utc>>,

    // Generated payload
    #[builder(default = STALE_CONTENT_VERSION)]
    pub content_version: i32,
    #[builder(default, setter(strip_option))]
    pub generated_content: Option<GeneratedContent>,
}

/// Output of one content generation run, stored as JSONB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub summary: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Where a record sits in the debounce lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CooldownState {
    /// No edit pending and content is current.
    Idle,
    /// Edited recently; becomes flaggable at `ready_at`.
    CoolingDown { ready_at: DateTime<Utc> },
    /// Cooldown elapsed; the next sweep flags it.
    ReadyToFlag,
    /// Already flagged, waiting for a batch run to regenerate it.
    AwaitingRegeneration,
}

/// Latest schedule time that counts as cooled down at `now`.
///
/// A record is flaggable iff `scheduled_refresh_at <= cooldown_cutoff(now, cooldown)`,
/// i.e. `now - scheduled_refresh_at >= cooldown`.
pub fn cooldown_cutoff(now: DateTime<Utc>, cooldown: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(cooldown)
        .ok()
        .and_then(|cooldown| now.checked_sub_signed(cooldown))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl RefreshableRecord {
    /// True when the record is waiting for regeneration.
    pub fn is_stale(&self) -> bool {
        self.content_version == STALE_CONTENT_VERSION
    }

    /// True when the cooldown on a pending edit has fully elapsed.
    pub fn cooldown_expired(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        self.scheduled_refresh_at
            .is_some_and(|scheduled| scheduled <= cooldown_cutoff(now, cooldown))
    }

    pub fn cooldown_state(&self, now: DateTime<Utc>, cooldown: Duration) -> CooldownState {
        match self.scheduled_refresh_at {
            Some(_) if self.cooldown_expired(now, cooldown) => CooldownState::ReadyToFlag,
            Some(scheduled) => CooldownState::CoolingDown {
                ready_at: chrono::Duration::from_std(cooldown)
                    .ok()
                    .and_then(|cooldown| scheduled.checked_add_signed(cooldown))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            },
            None if self.is_stale() => CooldownState::AwaitingRegeneration,
            None => CooldownState::Idle,
        }
    }

    /// Apply a content-affecting edit at `now`: restart the cooldown clock.
    ///
    /// The schedule never moves backwards, so an edit stamped earlier than
    /// the current schedule leaves it in place.
    pub fn apply_edit(&mut self, now: DateTime<Utc>) {
        self.last_edited_at = Some(now);
        self.scheduled_refresh_at = Some(match self.scheduled_refresh_at {
            Some(existing) if existing > now => existing,
            _ => now,
        });
    }

    /// Consume the cooldown and mark content stale. Content itself is kept
    /// until a regeneration replaces it.
    pub fn apply_flag(&mut self, now: DateTime<Utc>) {
        self.content_version = STALE_CONTENT_VERSION;
        self.scheduled_refresh_at = None;
        self.flagged_at = Some(now);
    }

    /// Replace content wholesale if the version still matches.
    pub fn apply_generated_content(
        &mut self,
        content: GeneratedContent,
        expected_prior_version: i32,
    ) -> bool {
        if self.content_version != expected_prior_version {
            return false;
        }
        self.generated_content = Some(content);
        self.content_version = expected_prior_version + 1;
        self.flagged_at = None;
        true
    }
}
