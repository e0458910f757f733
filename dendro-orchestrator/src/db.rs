use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Jobs and compute clients are stored as whole JSON documents. Generated
/// columns mirror the fields queries filter on so they can be indexed, and
/// they follow every `doc || patch` merge automatically.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            doc JSONB NOT NULL,
            service_name TEXT GENERATED ALWAYS AS (doc->>'serviceName') STORED,
            user_id TEXT GENERATED ALWAYS AS (doc->>'userId') STORED,
            batch_id TEXT GENERATED ALWAYS AS (doc->>'batchId') STORED,
            status TEXT GENERATED ALWAYS AS (doc->>'status') STORED,
            is_runnable BOOLEAN GENERATED ALWAYS AS ((doc->>'isRunnable')::boolean) STORED,
            compute_client_id TEXT GENERATED ALWAYS AS (doc->>'computeClientId') STORED,
            job_definition_hash TEXT GENERATED ALWAYS AS (doc->>'jobDefinitionHash') STORED,
            timestamp_created_sec DOUBLE PRECISION
                GENERATED ALWAYS AS ((doc->>'timestampCreatedSec')::double precision) STORED
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Jobs that had started when they were deleted
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS deleted_jobs (
            job_id TEXT PRIMARY KEY,
            doc JSONB NOT NULL,
            deleted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_jobs_runnable ON jobs(service_name, status, is_runnable)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_jobs_definition_hash
        ON jobs(service_name, job_definition_hash)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_jobs_compute_client ON jobs(compute_client_id, status)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_batch ON jobs(batch_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_jobs_dependencies
        ON jobs USING GIN ((doc->'jobDependencies'))
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS compute_clients (
            compute_client_id TEXT PRIMARY KEY,
            doc JSONB NOT NULL,
            user_id TEXT GENERATED ALWAYS AS (doc->>'userId') STORED
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS services (
            service_name TEXT PRIMARY KEY,
            doc JSONB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            api_key TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
