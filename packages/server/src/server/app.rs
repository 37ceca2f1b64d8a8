//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::refresh::{PostgresRecordStore, ResearchContentGenerator};
use crate::kernel::{BaseSearchService, NoopSearchService, OpenAIClient, ServerDeps, TavilyClient};
use crate::server::routes::{health_handler, refresh_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub deps: ServerDeps,
    /// Bearer token guarding the refresh trigger; `None` leaves it open
    pub trigger_token: Option<String>,
}

/// Wire production dependencies from configuration.
///
/// Search falls back to a no-op service when no Tavily key is configured;
/// generation then works from the product name and URL alone.
pub fn build_deps(config: &Config, pool: PgPool) -> Result<ServerDeps> {
    let ai = Arc::new(OpenAIClient::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    )?);

    let search: Arc<dyn BaseSearchService> = match &config.tavily_api_key {
        Some(key) => Arc::new(TavilyClient::new(key.clone())?),
        None => {
            tracing::warn!("TAVILY_API_KEY not set, content generation will run without web research");
            Arc::new(NoopSearchService)
        }
    };

    let generator = ResearchContentGenerator::new(search, ai).with_model(config.openai_model.clone());

    Ok(ServerDeps::new(
        Arc::new(PostgresRecordStore::new(pool)),
        Arc::new(generator),
        config.refresh_settings(),
    ))
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/internal/refresh", post(refresh_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
