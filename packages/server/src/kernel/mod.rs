//! Kernel module - server infrastructure and dependencies.

pub mod ai;
pub mod backoff;
pub mod deps;
pub mod scheduled_tasks;
pub mod tavily_client;
pub mod test_dependencies;
pub mod traits;

pub use ai::OpenAIClient;
pub use backoff::{execute, execute_with_policy, BackoffConfig};
pub use deps::{CycleGuard, ServerDeps};
pub use scheduled_tasks::start_scheduler;
pub use tavily_client::{NoopSearchService, TavilyClient};
pub use test_dependencies::{MockAI, MockContentGenerator, MockSearchService};
pub use traits::*;
