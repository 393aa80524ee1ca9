//! Postgres-backed job store.
//!
//! Terminal-state writes are guarded in SQL (`WHERE state = 'pending'`), so
//! the no-regress rule holds even across concurrent processes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use audioforge_core::{BlobKey, JobId, UserId};
use audioforge_generation::{GenerationJob, JobSpec, JobState, Service};

use super::{JobStore, JobStoreError};

/// Postgres job store over a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the jobs table if it does not exist (dev convenience; use real
    /// migrations in production deployments).
    pub async fn ensure_schema(&self) -> Result<(), JobStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS generation_jobs (
                id            UUID PRIMARY KEY,
                owner_id      UUID NOT NULL,
                service       TEXT NOT NULL,
                input_text    TEXT,
                source_audio  TEXT,
                target_voice  TEXT,
                state         TEXT NOT NULL DEFAULT 'pending',
                result_audio  TEXT,
                created_at    TIMESTAMPTZ NOT NULL,
                updated_at    TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS generation_jobs_owner_created \
             ON generation_jobs (owner_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}

fn storage_err(e: sqlx::Error) -> JobStoreError {
    JobStoreError::Storage(e.to_string())
}

fn row_to_job(row: &PgRow) -> Result<GenerationJob, JobStoreError> {
    let state = match row.try_get::<String, _>("state").map_err(storage_err)?.as_str() {
        "pending" => JobState::Pending,
        "succeeded" => JobState::Succeeded,
        "failed" => JobState::Failed,
        other => {
            return Err(JobStoreError::Storage(format!("unknown job state: {other}")));
        }
    };

    Ok(GenerationJob {
        id: JobId::from_uuid(row.try_get::<Uuid, _>("id").map_err(storage_err)?),
        owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id").map_err(storage_err)?),
        service: Service::from(row.try_get::<String, _>("service").map_err(storage_err)?),
        input_text: row.try_get::<Option<String>, _>("input_text").map_err(storage_err)?,
        source_audio: row
            .try_get::<Option<String>, _>("source_audio")
            .map_err(storage_err)?
            .map(BlobKey::from),
        target_voice: row
            .try_get::<Option<String>, _>("target_voice")
            .map_err(storage_err)?,
        state,
        result_audio: row
            .try_get::<Option<String>, _>("result_audio")
            .map_err(storage_err)?
            .map(BlobKey::from),
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(storage_err)?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(storage_err)?,
    })
}

const SELECT_COLS: &str = "id, owner_id, service, input_text, source_audio, target_voice, state, result_audio, created_at, updated_at";

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn create(&self, spec: JobSpec) -> Result<JobId, JobStoreError> {
        let job = GenerationJob::new(spec);
        sqlx::query(
            "INSERT INTO generation_jobs \
             (id, owner_id, service, input_text, source_audio, target_voice, state, result_audio, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', NULL, $7, $8)",
        )
        .bind(job.id.as_uuid())
        .bind(job.owner_id.as_uuid())
        .bind(job.service.as_str())
        .bind(&job.input_text)
        .bind(job.source_audio.as_ref().map(|k| k.as_str().to_string()))
        .bind(&job.target_voice)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(job.id)
    }

    async fn get(&self, owner: UserId, job_id: JobId) -> Result<GenerationJob, JobStoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM generation_jobs WHERE id = $1 AND owner_id = $2"
        ))
        .bind(job_id.as_uuid())
        .bind(owner.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        match row {
            Some(row) => row_to_job(&row),
            None => Err(JobStoreError::NotFound),
        }
    }

    async fn load(&self, job_id: JobId) -> Result<GenerationJob, JobStoreError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM generation_jobs WHERE id = $1"
        ))
        .bind(job_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        match row {
            Some(row) => row_to_job(&row),
            None => Err(JobStoreError::NotFound),
        }
    }

    async fn mark_succeeded(&self, job_id: JobId, result: BlobKey) -> Result<(), JobStoreError> {
        let updated = sqlx::query(
            "UPDATE generation_jobs \
             SET state = 'succeeded', result_audio = $2, updated_at = NOW() \
             WHERE id = $1 AND state = 'pending'",
        )
        .bind(job_id.as_uuid())
        .bind(result.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        // Zero rows means the job was already terminal (no-op) or missing.
        if updated.rows_affected() == 0 && self.load(job_id).await.is_err() {
            return Err(JobStoreError::NotFound);
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: JobId) -> Result<(), JobStoreError> {
        let updated = sqlx::query(
            "UPDATE generation_jobs \
             SET state = 'failed', updated_at = NOW() \
             WHERE id = $1 AND state = 'pending'",
        )
        .bind(job_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if updated.rows_affected() == 0 && self.load(job_id).await.is_err() {
            return Err(JobStoreError::NotFound);
        }
        Ok(())
    }

    async fn count_recent(&self, owner: UserId, window: Duration) -> Result<usize, JobStoreError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(window).map_err(|e| JobStoreError::Storage(e.to_string()))?;
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM generation_jobs WHERE owner_id = $1 AND created_at >= $2",
        )
        .bind(owner.as_uuid())
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        let n: i64 = row.try_get("n").map_err(storage_err)?;
        Ok(n.max(0) as usize)
    }

    async fn list_completed(
        &self,
        owner: UserId,
        service: &Service,
        limit: usize,
    ) -> Result<Vec<GenerationJob>, JobStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM generation_jobs \
             WHERE owner_id = $1 AND service = $2 AND state = 'succeeded' \
             ORDER BY created_at DESC LIMIT $3"
        ))
        .bind(owner.as_uuid())
        .bind(service.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(row_to_job).collect()
    }
}
