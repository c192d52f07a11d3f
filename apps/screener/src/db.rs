use anyhow::Result;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Creates a PostgreSQL pool sized for the screening worker pool plus HTTP
/// traffic, and applies pending migrations.
pub async fn create_pool(database_url: &str, max_concurrency: usize) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let max_connections = u32::try_from(max_concurrency * 2 + 4).unwrap_or(u32::MAX);
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    MIGRATOR.run(&pool).await?;
    info!(max_connections, "PostgreSQL connection pool established");
    Ok(pool)
}
