//! Refresh domain activities - the operations triggers invoke.

pub mod refresh_cycle;
pub mod run_batch;
pub mod sweep;

pub use refresh_cycle::{refresh_cycle, run_refresh_cycle};
pub use run_batch::run_batch;
pub use sweep::sweep;
