// Main entry point for the refresh API server

use anyhow::{Context, Result};
use refresh_core::kernel::start_scheduler;
use refresh_core::server::{build_app, build_deps, AppState};
use refresh_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,refresh_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting content refresh server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        cooldown_secs = config.refresh_cooldown_secs,
        batch_limit = config.refresh_batch_limit,
        "Configuration loaded"
    );

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let deps = build_deps(&config, pool.clone()).context("Failed to build server dependencies")?;

    // Keep the scheduler alive for the lifetime of the server
    let _scheduler = match &config.refresh_cron {
        Some(schedule) => Some(
            start_scheduler(deps.clone(), schedule)
                .await
                .context("Failed to start scheduled tasks")?,
        ),
        None => {
            tracing::info!("REFRESH_CRON is empty, periodic refresh disabled");
            None
        }
    };

    if config.refresh_trigger_token.is_none() {
        tracing::warn!("REFRESH_TRIGGER_TOKEN not set, /internal/refresh is unauthenticated");
    }

    let app = build_app(AppState {
        db_pool: pool,
        deps,
        trigger_token: config.refresh_trigger_token.clone(),
    });

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
