use std::time::Duration;

use thiserror::Error;

/// Failures that abort a sweep, batch run or refresh cycle.
///
/// Content-generation failures are not here: they become per-record
/// outcomes and never escalate.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Record store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Refresh cycle exceeded its {}s budget", .0.as_secs())]
    TimedOut(Duration),

    #[error("A refresh cycle is already running")]
    AlreadyRunning,
}

impl RefreshError {
    pub fn store(error: impl Into<anyhow::Error>) -> Self {
        Self::Store(error.into())
    }
}
