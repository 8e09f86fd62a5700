use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates the PostgreSQL connection pool and optionally applies pending migrations.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    run_migrations: bool,
) -> Result<PgPool> {
    info!("Connecting to PostgreSQL (max_connections={max_connections})...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    info!("PostgreSQL connection pool established");

    if run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply database migrations")?;
        info!("Database migrations applied");
    }

    Ok(pool)
}
