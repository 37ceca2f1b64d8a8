//! Content generation for product records.
//!
//! The batch runner only sees [`ContentGenerator`]. The production
//! implementation researches the product on the web and asks an LLM to
//! write the listing copy from what it found.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::domains::refresh::models::{GeneratedContent, RefreshableRecord};
use crate::kernel::{BaseAI, BaseSearchService, SearchResult};

/// Produces fresh content for one record. May fail transiently; callers
/// wrap it in the backoff executor.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, record: &RefreshableRecord) -> Result<GeneratedContent>;
}

const MAX_SEARCH_RESULTS: usize = 5;
const MAX_SNIPPET_CHARS: usize = 1200;

const SYSTEM_PROMPT: &str = "You write concise, factual product directory entries. \
Use only the research provided. Return an object with keys \"summary\" (2-4 sentences), \
\"highlights\" (3-6 short bullet strings) and \"sources\" (URLs you relied on).";

#[derive(Debug, Deserialize)]
struct ListingDraft {
    summary: String,
    #[serde(default)]
    highlights: Vec<String>,
    #[serde(default)]
    sources: Vec<String>,
}

/// Search-then-summarize generator.
pub struct ResearchContentGenerator {
    search: Arc<dyn BaseSearchService>,
    ai: Arc<dyn BaseAI>,
    model: Option<String>,
}

impl ResearchContentGenerator {
    pub fn new(search: Arc<dyn BaseSearchService>, ai: Arc<dyn BaseAI>) -> Self {
        Self {
            search,
            ai,
            model: None,
        }
    }

    /// Model name recorded on generated content.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    fn search_query(record: &RefreshableRecord) -> String {
        match &record.website_url {
            Some(url) => format!("{} {} product overview features", record.name, url),
            None => format!("{} product overview features", record.name),
        }
    }

    fn user_prompt(record: &RefreshableRecord, research: &[SearchResult]) -> String {
        let mut prompt = format!("Product: {}\n", record.name);
        if let Some(url) = &record.website_url {
            prompt.push_str(&format!("Website: {}\n", url));
        }

        if research.is_empty() {
            prompt.push_str("\nNo web research is available. Describe only what the name and website make evident.\n");
            return prompt;
        }

        prompt.push_str("\nResearch:\n");
        for (i, result) in research.iter().enumerate() {
            let snippet: String = result.content.chars().take(MAX_SNIPPET_CHARS).collect();
            prompt.push_str(&format!(
                "\n[{}] {}\nURL: {}\n{}\n",
                i + 1,
                result.title,
                result.url,
                snippet
            ));
        }
        prompt
    }
}

#[async_trait]
impl ContentGenerator for ResearchContentGenerator {
    async fn generate(&self, record: &RefreshableRecord) -> Result<GeneratedContent> {
        let research = self
            .search
            .search(&Self::search_query(record), Some(MAX_SEARCH_RESULTS))
            .await
            .context("Product research search failed")?;

        tracing::debug!(
            record_id = %record.id,
            results = research.len(),
            "Research gathered for content generation"
        );

        let raw = self
            .ai
            .complete_json(SYSTEM_PROMPT, &Self::user_prompt(record, &research))
            .await
            .context("Content generation call failed")?;

        let draft: ListingDraft =
            serde_json::from_str(&raw).context("Content generation returned malformed JSON")?;

        if draft.summary.trim().is_empty() {
            anyhow::bail!("Content generation returned an empty summary");
        }

        let sources = if draft.sources.is_empty() {
            research.into_iter().map(|r| r.url).collect()
        } else {
            draft.sources
        };

        Ok(GeneratedContent {
            summary: draft.summary.trim().to_string(),
            highlights: draft.highlights,
            sources,
            model: self.model.clone(),
            generated_at: Utc::now(),
        })
    }
}
