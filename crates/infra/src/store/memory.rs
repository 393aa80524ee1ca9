//! In-memory job store for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use audioforge_core::{BlobKey, JobId, UserId};
use audioforge_generation::{GenerationJob, JobSpec, JobState, Service};

use super::{JobStore, JobStoreError};

/// In-memory job store (RwLock over a map), the default for dev and tests.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, GenerationJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: overwrite a job's `created_at` to simulate age.
    pub fn backdate(&self, job_id: JobId, created_at: chrono::DateTime<Utc>) {
        let mut jobs = self.jobs.write().unwrap();
        if let Some(job) = jobs.get_mut(&job_id) {
            job.created_at = created_at;
        }
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, spec: JobSpec) -> Result<JobId, JobStoreError> {
        let job = GenerationJob::new(spec);
        let id = job.id;
        self.jobs.write().unwrap().insert(id, job);
        Ok(id)
    }

    async fn get(&self, owner: UserId, job_id: JobId) -> Result<GenerationJob, JobStoreError> {
        let jobs = self.jobs.read().unwrap();
        match jobs.get(&job_id) {
            Some(job) if job.owner_id == owner => Ok(job.clone()),
            // Ownership misses are indistinguishable from absence.
            _ => Err(JobStoreError::NotFound),
        }
    }

    async fn load(&self, job_id: JobId) -> Result<GenerationJob, JobStoreError> {
        let jobs = self.jobs.read().unwrap();
        jobs.get(&job_id).cloned().ok_or(JobStoreError::NotFound)
    }

    async fn mark_succeeded(&self, job_id: JobId, result: BlobKey) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&job_id).ok_or(JobStoreError::NotFound)?;
        job.mark_succeeded(result);
        Ok(())
    }

    async fn mark_failed(&self, job_id: JobId) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&job_id).ok_or(JobStoreError::NotFound)?;
        job.mark_failed();
        Ok(())
    }

    async fn count_recent(&self, owner: UserId, window: Duration) -> Result<usize, JobStoreError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(window).map_err(|e| JobStoreError::Storage(e.to_string()))?;
        let jobs = self.jobs.read().unwrap();
        Ok(jobs
            .values()
            .filter(|j| j.owner_id == owner && j.created_at >= cutoff)
            .count())
    }

    async fn list_completed(
        &self,
        owner: UserId,
        service: &Service,
        limit: usize,
    ) -> Result<Vec<GenerationJob>, JobStoreError> {
        let jobs = self.jobs.read().unwrap();
        let mut result: Vec<_> = jobs
            .values()
            .filter(|j| j.owner_id == owner && &j.service == service && j.state == JobState::Succeeded)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioforge_core::DomainError;

    fn tts_spec(owner: UserId, text: &str) -> JobSpec {
        JobSpec::validate(
            owner,
            Service::TextToSpeech,
            Some(text.to_string()),
            None,
            Some("andreas".to_string()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_returns_pending_job() {
        let store = InMemoryJobStore::new();
        let owner = UserId::new();

        let id = store.create(tts_spec(owner, "hello")).await.unwrap();
        let job = store.get(owner, id).await.unwrap();

        assert_eq!(job.id, id);
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.input_text.as_deref(), Some("hello"));
        assert_eq!(job.target_voice.as_deref(), Some("andreas"));
    }

    #[tokio::test]
    async fn non_owner_observes_not_found() {
        let store = InMemoryJobStore::new();
        let owner = UserId::new();
        let id = store.create(tts_spec(owner, "hello")).await.unwrap();

        assert!(matches!(
            store.get(UserId::new(), id).await,
            Err(JobStoreError::NotFound)
        ));
        // The orchestrator-side load is not owner-scoped.
        assert!(store.load(id).await.is_ok());
    }

    #[tokio::test]
    async fn terminal_writes_do_not_regress() {
        let store = InMemoryJobStore::new();
        let owner = UserId::new();
        let id = store.create(tts_spec(owner, "hello")).await.unwrap();

        store
            .mark_succeeded(id, BlobKey::from("results/a.wav"))
            .await
            .unwrap();
        store.mark_failed(id).await.unwrap();

        let job = store.get(owner, id).await.unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.result_audio, Some(BlobKey::from("results/a.wav")));
    }

    #[tokio::test]
    async fn count_recent_respects_the_window() {
        let store = InMemoryJobStore::new();
        let owner = UserId::new();

        for _ in 0..3 {
            store.create(tts_spec(owner, "hi")).await.unwrap();
        }
        let old = store.create(tts_spec(owner, "old")).await.unwrap();
        store.backdate(old, Utc::now() - chrono::Duration::seconds(120));

        // Another owner's jobs never count.
        store.create(tts_spec(UserId::new(), "other")).await.unwrap();

        let count = store
            .count_recent(owner, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn list_completed_is_newest_first_and_succeeded_only() {
        let store = InMemoryJobStore::new();
        let owner = UserId::new();

        let a = store.create(tts_spec(owner, "a")).await.unwrap();
        let b = store.create(tts_spec(owner, "b")).await.unwrap();
        let _pending = store.create(tts_spec(owner, "c")).await.unwrap();
        store.backdate(a, Utc::now() - chrono::Duration::seconds(10));

        store.mark_succeeded(a, BlobKey::from("results/a.wav")).await.unwrap();
        store.mark_succeeded(b, BlobKey::from("results/b.wav")).await.unwrap();

        let items = store
            .list_completed(owner, &Service::TextToSpeech, 10)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, b);
        assert_eq!(items[1].id, a);
    }

    #[test]
    fn invalid_spec_never_reaches_the_store() {
        // Validation is the domain layer's job; the store only takes JobSpec.
        let err = JobSpec::validate(UserId::new(), Service::TextToSpeech, None, None, None);
        assert!(matches!(err, Err(DomainError::InvalidSpec(_))));
    }
}
