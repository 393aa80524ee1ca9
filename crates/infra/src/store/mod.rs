//! Durable storage for generation jobs.

use std::time::Duration;

use async_trait::async_trait;

use audioforge_core::{BlobKey, JobId, UserId};
use audioforge_generation::{GenerationJob, JobSpec, Service};

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::InMemoryJobStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresJobStore;

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    /// The job does not exist, or is not owned by the caller.
    #[error("job not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(String),
}

/// Durable record of each generation request and its lifecycle state.
///
/// The submission path writes the initial row; the orchestrator writes the
/// terminal state exactly once. `mark_succeeded`/`mark_failed` on an
/// already-terminal job are no-ops: state never regresses, a repeated call
/// never corrupts.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new `Pending` job from a validated spec; returns its id.
    async fn create(&self, spec: JobSpec) -> Result<JobId, JobStoreError>;

    /// Fetch a job, enforcing ownership: a non-owner observes `NotFound`.
    async fn get(&self, owner: UserId, job_id: JobId) -> Result<GenerationJob, JobStoreError>;

    /// Fetch a job by id without an ownership filter (orchestrator side).
    async fn load(&self, job_id: JobId) -> Result<GenerationJob, JobStoreError>;

    /// Write the `Succeeded` terminal state with the backend's result key.
    async fn mark_succeeded(&self, job_id: JobId, result: BlobKey) -> Result<(), JobStoreError>;

    /// Write the `Failed` terminal state.
    async fn mark_failed(&self, job_id: JobId) -> Result<(), JobStoreError>;

    /// Count the owner's jobs with `created_at >= now - window`.
    async fn count_recent(&self, owner: UserId, window: Duration) -> Result<usize, JobStoreError>;

    /// Newest-first succeeded jobs for the owner's history view.
    async fn list_completed(
        &self,
        owner: UserId,
        service: &Service,
        limit: usize,
    ) -> Result<Vec<GenerationJob>, JobStoreError>;
}
