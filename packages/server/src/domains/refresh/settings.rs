use std::time::Duration;

use crate::kernel::BackoffConfig;

/// Tunables for one refresh cycle, passed explicitly into every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Quiet period after the last edit before a record may be flagged
    pub cooldown: Duration,
    /// Default number of flagged records regenerated per cycle
    pub batch_limit: usize,
    /// Wall-clock budget for sweep + batch together
    pub cycle_timeout: Duration,
    pub backoff: BackoffConfig,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(3600),
            batch_limit: 10,
            cycle_timeout: Duration::from_secs(300),
            backoff: BackoffConfig::default(),
        }
    }
}
