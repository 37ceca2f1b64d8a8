use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BaseSearchService, SearchResult};

/// Tavily API client for web search
pub struct TavilyClient {
    api_key: String,
    client: reqwest::Client,
}

/// Tavily API request
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_results: Option<usize>,
}

/// Tavily API response
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
    score: f64,
    #[serde(default)]
    published_date: Option<String>,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { api_key, client })
    }
}

#[async_trait]
impl BaseSearchService for TavilyClient {
    async fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<SearchResult>> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "basic",
            max_results,
        };

        let response = self
            .client
            .post("https://api.tavily.com/search")
            .json(&request)
            .send()
            .await
            .context("Failed to send Tavily search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Tavily API error {}: {}", status, body);
        }

        let tavily_response: TavilyResponse = response
            .json()
            .await
            .context("Failed to parse Tavily response")?;

        tracing::debug!(query, results = tavily_response.results.len(), "Tavily search complete");

        Ok(tavily_response
            .results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                content: r.content,
                score: r.score,
                published_date: r.published_date,
            })
            .collect())
    }
}

/// No-op search service for when no Tavily API key is configured
pub struct NoopSearchService;

#[async_trait]
impl BaseSearchService for NoopSearchService {
    async fn search(&self, query: &str, _max_results: Option<usize>) -> Result<Vec<SearchResult>> {
        tracing::debug!(query, "NoopSearchService: search skipped, no Tavily API key configured");
        Ok(vec![])
    }
}
