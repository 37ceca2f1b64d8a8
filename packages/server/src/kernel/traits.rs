// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// What to search for and what to prompt lives in the refresh domain.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseSearchService)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a prompt with an LLM (returns raw text response)
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Complete a prompt expecting a JSON object back (returns raw JSON string)
    /// Parse with serde_json::from_str in calling code
    async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let system = format!("{}\n\nRespond with a single valid JSON object.", system_prompt);
        self.complete(&system, user_prompt).await
    }
}

// =============================================================================
// Search Service Trait (Infrastructure)
// =============================================================================

/// A single web search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
    pub published_date: Option<String>,
}

#[async_trait]
pub trait BaseSearchService: Send + Sync {
    /// Search the web; `max_results` defaults to the provider's own limit
    async fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<SearchResult>>;
}
