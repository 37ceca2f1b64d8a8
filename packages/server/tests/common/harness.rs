//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container is shared by every test. Migrations run once into a
//! template database; each harness then gets its own database cloned from
//! that template, so sweeps and batch runs in parallel tests never see each
//! other's rows.

use anyhow::{Context, Result};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use refresh_core::domains::refresh::PostgresRecordStore;

const TEMPLATE_DB: &str = "refresh_template";

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    server_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

/// Global shared infrastructure - initialized once, reused by all tests.
static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let server_url = format!("postgresql://postgres:postgres@{}:{}", pg_host, pg_port);

        let admin = PgPool::connect(&format!("{}/postgres", server_url))
            .await
            .context("Failed to connect to Postgres")?;
        sqlx::query(&format!("CREATE DATABASE {}", TEMPLATE_DB))
            .execute(&admin)
            .await
            .context("Failed to create template database")?;
        admin.close().await;

        // Migrations run once, into the template
        let template = PgPool::connect(&format!("{}/{}", server_url, TEMPLATE_DB))
            .await
            .context("Failed to connect to template database")?;
        sqlx::migrate!("./migrations")
            .run(&template)
            .await
            .context("Failed to run migrations")?;
        // Cloning requires no open connections to the template
        template.close().await;

        Ok(Self {
            server_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }

    async fn create_database(&self) -> Result<String> {
        let name = format!("refresh_test_{}", Uuid::new_v4().simple());

        let admin = PgPool::connect(&format!("{}/postgres", self.server_url))
            .await
            .context("Failed to connect to Postgres")?;
        sqlx::query(&format!("CREATE DATABASE {} TEMPLATE {}", name, TEMPLATE_DB))
            .execute(&admin)
            .await
            .with_context(|| format!("Failed to create database {}", name))?;
        admin.close().await;

        Ok(format!("{}/{}", self.server_url, name))
    }
}

/// Test harness that manages test infrastructure.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let store = ctx.store();
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    /// Database pool for this test's private database.
    pub db_pool: PgPool,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;
        let db_url = infra.create_database().await?;

        let db_pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to test database")?;

        Ok(Self { db_pool })
    }

    pub fn store(&self) -> PostgresRecordStore {
        PostgresRecordStore::new(self.db_pool.clone())
    }
}
