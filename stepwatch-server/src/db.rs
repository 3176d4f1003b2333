use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create delay queue table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS delay_queue (
            job_key TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            not_before TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Due entries are found by score
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_delay_queue_not_before ON delay_queue(not_before)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
