// TestDependencies - mock implementations for testing
//
// Provides mock providers and generators that can be injected into
// ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{BaseAI, BaseSearchService, SearchResult};
use crate::common::RecordId;
use crate::domains::refresh::{ContentGenerator, GeneratedContent, RefreshableRecord};

// =============================================================================
// Mock AI
// =============================================================================

pub struct MockAI {
    responses: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a response; responses are returned in order
    pub fn with_response(self, response: &str) -> Self {
        self.responses.lock().unwrap().push(response.to_string());
        self
    }

    /// Get all user prompts that were sent
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            Ok(responses.remove(0))
        } else {
            Ok(r#"{"summary": "Mock summary.", "highlights": [], "sources": []}"#.to_string())
        }
    }
}

// =============================================================================
// Mock Search Service
// =============================================================================

pub struct MockSearchService {
    results: Arc<Mutex<Vec<SearchResult>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockSearchService {
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(Vec::new())),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a result returned for every query
    pub fn with_result(self, title: &str, url: &str, content: &str) -> Self {
        self.results.lock().unwrap().push(SearchResult {
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
            score: 0.9,
            published_date: None,
        });
        self
    }

    /// Get all queries that were searched
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockSearchService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSearchService for MockSearchService {
    async fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());

        let results = self.results.lock().unwrap();
        let limit = max_results.unwrap_or(results.len());
        Ok(results.iter().take(limit).cloned().collect())
    }
}

// =============================================================================
// Mock Content Generator
// =============================================================================

/// How the mock generator behaves for one record
#[derive(Debug, Clone, Copy)]
enum Script {
    FailAlways,
    FailTimes(u32),
}

/// Scripted generator: succeeds unless told otherwise per record.
pub struct MockContentGenerator {
    scripts: Mutex<HashMap<RecordId, Script>>,
    calls: Mutex<Vec<RecordId>>,
}

impl MockContentGenerator {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call for this record fails
    pub fn failing_for(self, id: RecordId) -> Self {
        self.scripts.lock().unwrap().insert(id, Script::FailAlways);
        self
    }

    /// The first `times` calls for this record fail, later ones succeed
    pub fn flaky_for(self, id: RecordId, times: u32) -> Self {
        self.scripts.lock().unwrap().insert(id, Script::FailTimes(times));
        self
    }

    /// Every generate call, in order
    pub fn calls(&self) -> Vec<RecordId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, id: RecordId) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == id).count()
    }

    /// Content this generator produces for a record
    pub fn content_for(record: &RefreshableRecord) -> GeneratedContent {
        GeneratedContent {
            summary: format!("Generated summary for {}", record.name),
            highlights: vec![format!("{} highlight", record.name)],
            sources: record.website_url.iter().cloned().collect(),
            model: Some("mock".to_string()),
            generated_at: Utc::now(),
        }
    }
}

impl Default for MockContentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for MockContentGenerator {
    async fn generate(&self, record: &RefreshableRecord) -> Result<GeneratedContent> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(record.id);
            calls.iter().filter(|c| **c == record.id).count() as u32
        };

        let script = self.scripts.lock().unwrap().get(&record.id).copied();
        match script {
            Some(Script::FailAlways) => {
                anyhow::bail!("provider unavailable for {} (call {})", record.name, call_number)
            }
            Some(Script::FailTimes(n)) if call_number <= n => {
                anyhow::bail!("transient provider error (call {})", call_number)
            }
            _ => Ok(Self::content_for(record)),
        }
    }
}
