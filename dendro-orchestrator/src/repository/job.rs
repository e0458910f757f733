//! Job Repository
//!
//! Handles all persistence of jobs. Status changes go through
//! [`JobStore::update_if_status`], which only applies when the stored status
//! still matches the caller's snapshot.

use async_trait::async_trait;
use dendro_core::domain::job::{Job, JobStatus};
use dendro_core::dto::job::JobQuery;
use dendro_core::patch::JobPatch;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::StoreError;

/// Pending, runnable, uncanceled jobs of one service
#[derive(Debug, Clone)]
pub struct RunnableQuery {
    pub service_name: String,
    /// Only jobs owned by these users
    pub user_ids: Option<Vec<String>>,
    pub job_id: Option<String>,
}

impl RunnableQuery {
    pub fn matches(&self, job: &Job) -> bool {
        job.service_name == self.service_name
            && job.status == JobStatus::Pending
            && job.is_runnable
            && !job.canceled
            && self.user_ids.as_ref().is_none_or(|users| users.contains(&job.user_id))
            && self.job_id.as_ref().is_none_or(|id| *id == job.job_id)
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: &Job) -> Result<(), StoreError>;

    async fn find_by_id(&self, job_id: &str) -> Result<Option<Job>, StoreError>;

    async fn find_by_ids(&self, job_ids: &[String]) -> Result<Vec<Job>, StoreError>;

    /// Newest first, capped at `query.limit`
    async fn find(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError>;

    /// Jobs of a service with the given definition hash, newest first
    async fn find_by_definition_hash(
        &self,
        service_name: &str,
        hash: &str,
    ) -> Result<Vec<Job>, StoreError>;

    /// Starting or running jobs bound to a compute client
    async fn find_active_for_compute_client(
        &self,
        compute_client_id: &str,
    ) -> Result<Vec<Job>, StoreError>;

    /// Random sample of at most `sample_size` matching jobs
    async fn sample_runnable(
        &self,
        query: &RunnableQuery,
        sample_size: usize,
    ) -> Result<Vec<Job>, StoreError>;

    /// Pending, not yet runnable jobs that depend on `job_id`
    async fn find_blocked_dependents(&self, job_id: &str) -> Result<Vec<Job>, StoreError>;

    /// Unconditional patch; false when the job does not exist
    async fn update(&self, job_id: &str, patch: &JobPatch) -> Result<bool, StoreError>;

    /// Patch only if the stored status is `expected`; false otherwise
    async fn update_if_status(
        &self,
        job_id: &str,
        expected: JobStatus,
        patch: &JobPatch,
    ) -> Result<bool, StoreError>;

    /// Flip a pending job from blocked to runnable; false if another
    /// caller got there first or the job left pending
    async fn mark_runnable(&self, job_id: &str, patch: &JobPatch) -> Result<bool, StoreError>;

    /// Move a job to the archive
    async fn archive(&self, job_id: &str) -> Result<bool, StoreError>;

    /// Remove a job for good, only if the stored status is `expected`
    async fn delete_if_status(&self, job_id: &str, expected: JobStatus) -> Result<bool, StoreError>;
}

/// Postgres-backed job store
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unwrap_docs(rows: Vec<Json<Job>>) -> Vec<Job> {
    rows.into_iter().map(|row| row.0).collect()
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO jobs (job_id, doc) VALUES ($1, $2)")
            .bind(&job.job_id)
            .bind(Json(job))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Job>>("SELECT doc FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    async fn find_by_ids(&self, job_ids: &[String]) -> Result<Vec<Job>, StoreError> {
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_scalar::<_, Json<Job>>("SELECT doc FROM jobs WHERE job_id = ANY($1)")
            .bind(job_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(unwrap_docs(rows))
    }

    async fn find(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT doc FROM jobs WHERE TRUE");

        if let Some(service_name) = &query.service_name {
            builder.push(" AND service_name = ").push_bind(service_name);
        }
        if let Some(user_id) = &query.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(batch_id) = &query.batch_id {
            builder.push(" AND batch_id = ").push_bind(batch_id);
        }
        if let Some(compute_client_id) = &query.compute_client_id {
            builder.push(" AND compute_client_id = ").push_bind(compute_client_id);
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(tags) = &query.tags {
            builder.push(" AND doc->'tags' @> ").push_bind(Json(tags));
        }
        if let Some(job_ids) = &query.job_ids {
            builder.push(" AND job_id = ANY(").push_bind(job_ids).push(")");
        }
        builder.push(" ORDER BY timestamp_created_sec DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build_query_scalar::<Json<Job>>().fetch_all(&self.pool).await?;
        Ok(unwrap_docs(rows))
    }

    async fn find_by_definition_hash(
        &self,
        service_name: &str,
        hash: &str,
    ) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Job>>(
            r#"
            SELECT doc FROM jobs
            WHERE service_name = $1 AND job_definition_hash = $2
            ORDER BY timestamp_created_sec DESC
            "#,
        )
        .bind(service_name)
        .bind(hash)
        .fetch_all(&self.pool)
        .await?;
        Ok(unwrap_docs(rows))
    }

    async fn find_active_for_compute_client(
        &self,
        compute_client_id: &str,
    ) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Job>>(
            r#"
            SELECT doc FROM jobs
            WHERE compute_client_id = $1 AND status IN ('starting', 'running')
            "#,
        )
        .bind(compute_client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(unwrap_docs(rows))
    }

    async fn sample_runnable(
        &self,
        query: &RunnableQuery,
        sample_size: usize,
    ) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Job>>(
            r#"
            SELECT doc FROM jobs
            WHERE service_name = $1
              AND status = 'pending'
              AND is_runnable
              AND NOT (doc->>'canceled')::boolean
              AND ($2::text[] IS NULL OR user_id = ANY($2))
              AND ($3::text IS NULL OR job_id = $3)
            ORDER BY random()
            LIMIT $4
            "#,
        )
        .bind(&query.service_name)
        .bind(query.user_ids.as_deref())
        .bind(query.job_id.as_deref())
        .bind(sample_size as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(unwrap_docs(rows))
    }

    async fn find_blocked_dependents(&self, job_id: &str) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Job>>(
            r#"
            SELECT doc FROM jobs
            WHERE status = 'pending'
              AND NOT is_runnable
              AND doc->'jobDependencies' @> jsonb_build_array($1::text)
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(unwrap_docs(rows))
    }

    async fn update(&self, job_id: &str, patch: &JobPatch) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE jobs SET doc = doc || $2 WHERE job_id = $1")
            .bind(job_id)
            .bind(Json(patch.to_document()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_if_status(
        &self,
        job_id: &str,
        expected: JobStatus,
        patch: &JobPatch,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE jobs SET doc = doc || $2 WHERE job_id = $1 AND status = $3")
                .bind(job_id)
                .bind(Json(patch.to_document()))
                .bind(expected.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_runnable(&self, job_id: &str, patch: &JobPatch) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET doc = doc || $2
            WHERE job_id = $1 AND status = 'pending' AND NOT is_runnable
            "#,
        )
        .bind(job_id)
        .bind(Json(patch.to_document()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn archive(&self, job_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            WITH moved AS (
                DELETE FROM jobs WHERE job_id = $1 RETURNING job_id, doc
            )
            INSERT INTO deleted_jobs (job_id, doc)
            SELECT job_id, doc FROM moved
            ON CONFLICT (job_id) DO UPDATE SET doc = EXCLUDED.doc, deleted_at = NOW()
            "#,
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_if_status(
        &self,
        job_id: &str,
        expected: JobStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE job_id = $1 AND status = $2")
            .bind(job_id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
