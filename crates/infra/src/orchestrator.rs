//! Job orchestrator: drives a job from submission to a terminal state.
//!
//! A supervisor task owns per-owner lanes: each owner gets at most
//! `per_owner_concurrency` in-flight invocations, excess same-owner work
//! queues FIFO, and owners are fully independent of one another. A job is
//! processed single-flight: one attempt at a time, one terminal write.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use audioforge_core::{JobId, UserId};
use audioforge_generation::RetryPolicy;

use crate::backend::{BackendDispatcher, BackendError, DispatchError};
use crate::credits::CreditLedger;
use crate::store::JobStore;

/// Policy knobs for the orchestrator. All of these are deployment
/// configuration, not structural constants.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Max concurrent backend invocations per owner; excess work queues.
    pub per_owner_concurrency: usize,
    /// Retry budget for transient backend errors.
    pub retry: RetryPolicy,
    /// Bound on a single backend invocation.
    pub attempt_timeout: Duration,
    /// Credits deducted per successful generation.
    pub credit_cost: i64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            per_owner_concurrency: 3,
            retry: RetryPolicy::default(),
            attempt_timeout: Duration::from_secs(120),
            credit_cost: 50,
        }
    }
}

enum Msg {
    Submit { owner: UserId, job_id: JobId },
    Done { owner: UserId },
}

/// Handle used by the submission path. Enqueueing is fire-and-forget: the
/// caller gets its job id back immediately and discovers the outcome by
/// polling.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::UnboundedSender<Msg>,
}

impl OrchestratorHandle {
    pub fn enqueue(&self, owner: UserId, job_id: JobId) {
        if self.tx.send(Msg::Submit { owner, job_id }).is_err() {
            error!(%job_id, "orchestrator is gone; job will stay pending");
        }
    }
}

/// The generation orchestrator. Sole writer of terminal job state.
pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    dispatcher: Arc<dyn BackendDispatcher>,
    credits: Arc<dyn CreditLedger>,
    config: OrchestratorConfig,
}

struct OwnerLane {
    running: usize,
    queue: VecDeque<JobId>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        dispatcher: Arc<dyn BackendDispatcher>,
        credits: Arc<dyn CreditLedger>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            credits,
            config,
        }
    }

    /// Spawn the supervisor task and return the submission handle.
    pub fn spawn(self) -> OrchestratorHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let loop_tx = tx.clone();
        tokio::spawn(supervisor_loop(Arc::new(self), rx, loop_tx));
        OrchestratorHandle { tx }
    }

    /// Process one job to a terminal state.
    ///
    /// Routing errors fail the job immediately; backend errors (including
    /// per-attempt timeouts) are retried with the same payload until the
    /// budget is exhausted. Terminal jobs are left untouched.
    async fn run_job(&self, job_id: JobId) {
        let job = match self.store.load(job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!(%job_id, error = %e, "cannot load submitted job");
                return;
            }
        };

        if job.state.is_terminal() {
            debug!(%job_id, state = ?job.state, "job already terminal; nothing to do");
            return;
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let backoff = self.config.retry.delay_for_attempt(attempt);
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }

            let outcome = match tokio::time::timeout(
                self.config.attempt_timeout,
                self.dispatcher.invoke(&job),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(DispatchError::Backend(BackendError::transport(
                    "backend invocation timed out",
                ))),
            };

            match outcome {
                Ok(result) => {
                    if let Err(e) = self.store.mark_succeeded(job_id, result.clone()).await {
                        error!(%job_id, error = %e, "failed to persist successful result");
                        return;
                    }
                    info!(%job_id, attempt, result = %result, "generation succeeded");

                    // Settlement failures must not mask a successful
                    // generation: log and move on, never revert the job.
                    match self
                        .credits
                        .deduct(job.owner_id, self.config.credit_cost)
                        .await
                    {
                        Ok(remaining) => {
                            debug!(%job_id, owner = %job.owner_id, remaining, "credits settled")
                        }
                        Err(e) => {
                            warn!(%job_id, owner = %job.owner_id, error = %e, "credit settlement failed; job result stands")
                        }
                    }
                    return;
                }
                Err(DispatchError::Routing(service)) => {
                    warn!(%job_id, service = %service, "no backend route; failing job");
                    self.fail_job(job_id).await;
                    return;
                }
                Err(DispatchError::Backend(e)) => {
                    warn!(%job_id, attempt, error = %e, "backend invocation failed");
                    if !self.config.retry.should_retry(attempt) {
                        info!(%job_id, attempts = attempt, "retry budget exhausted; failing job");
                        self.fail_job(job_id).await;
                        return;
                    }
                }
            }
        }
    }

    async fn fail_job(&self, job_id: JobId) {
        if let Err(e) = self.store.mark_failed(job_id).await {
            error!(%job_id, error = %e, "failed to persist job failure");
        }
    }
}

async fn supervisor_loop(
    orchestrator: Arc<Orchestrator>,
    mut rx: mpsc::UnboundedReceiver<Msg>,
    tx: mpsc::UnboundedSender<Msg>,
) {
    info!("orchestrator started");
    let mut lanes: HashMap<UserId, OwnerLane> = HashMap::new();

    while let Some(msg) = rx.recv().await {
        match msg {
            Msg::Submit { owner, job_id } => {
                let limit = orchestrator.config.per_owner_concurrency;
                let lane = lanes.entry(owner).or_insert_with(|| OwnerLane {
                    running: 0,
                    queue: VecDeque::new(),
                });
                if lane.running < limit {
                    lane.running += 1;
                    spawn_job(&orchestrator, &tx, owner, job_id);
                } else {
                    debug!(%owner, %job_id, queued = lane.queue.len() + 1, "owner at concurrency limit; queueing");
                    lane.queue.push_back(job_id);
                }
            }
            Msg::Done { owner } => {
                if let Some(lane) = lanes.get_mut(&owner) {
                    lane.running = lane.running.saturating_sub(1);
                    if let Some(next) = lane.queue.pop_front() {
                        lane.running += 1;
                        spawn_job(&orchestrator, &tx, owner, next);
                    } else if lane.running == 0 {
                        lanes.remove(&owner);
                    }
                }
            }
        }
    }
}

fn spawn_job(
    orchestrator: &Arc<Orchestrator>,
    tx: &mpsc::UnboundedSender<Msg>,
    owner: UserId,
    job_id: JobId,
) {
    let orchestrator = orchestrator.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        orchestrator.run_job(job_id).await;
        let _ = tx.send(Msg::Done { owner });
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use audioforge_core::BlobKey;
    use audioforge_generation::{GenerationJob, JobSpec, JobState, Service};

    use super::*;
    use crate::credits::InMemoryCreditLedger;
    use crate::store::InMemoryJobStore;

    /// Scripted dispatcher: pops one outcome per invocation, records calls.
    struct ScriptedDispatcher {
        script: Mutex<VecDeque<Result<BlobKey, DispatchError>>>,
        invocations: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        order: Mutex<Vec<JobId>>,
        delay: Duration,
    }

    impl ScriptedDispatcher {
        fn new(script: Vec<Result<BlobKey, DispatchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                invocations: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                order: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn invocations(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackendDispatcher for ScriptedDispatcher {
        async fn invoke(&self, job: &GenerationJob) -> Result<BlobKey, DispatchError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(job.id);

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(BlobKey::from("results/default.wav")))
        }
    }

    fn backend_500() -> Result<BlobKey, DispatchError> {
        Err(DispatchError::Backend(BackendError {
            status: Some(500),
            message: "Internal Server Error".to_string(),
        }))
    }

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

    fn fast_config(per_owner: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            per_owner_concurrency: per_owner,
            retry: RetryPolicy::fixed(2, Duration::ZERO),
            attempt_timeout: Duration::from_secs(5),
            credit_cost: 50,
        }
    }

    async fn wait_for_terminal(store: &InMemoryJobStore, job_id: JobId) -> GenerationJob {
        for _ in 0..500 {
            let job = store.load(job_id).await.unwrap();
            if job.state.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job never reached a terminal state");
    }

    struct Rig {
        store: Arc<InMemoryJobStore>,
        dispatcher: Arc<ScriptedDispatcher>,
        credits: Arc<InMemoryCreditLedger>,
        handle: OrchestratorHandle,
    }

    fn rig(dispatcher: ScriptedDispatcher, config: OrchestratorConfig) -> Rig {
        let store = Arc::new(InMemoryJobStore::new());
        let dispatcher = Arc::new(dispatcher);
        let credits = Arc::new(InMemoryCreditLedger::new());
        let handle = Orchestrator::new(
            store.clone(),
            dispatcher.clone(),
            credits.clone(),
            config,
        )
        .spawn();
        Rig {
            store,
            dispatcher,
            credits,
            handle,
        }
    }

    #[tokio::test]
    async fn successful_job_settles_credits() {
        let r = rig(
            ScriptedDispatcher::new(vec![Ok(BlobKey::from("results/hello.wav"))]),
            fast_config(3),
        );
        let owner = UserId::new();
        r.credits.grant(owner, 100).await.unwrap();

        let job_id = r.store.create(tts_spec(owner, "hello")).await.unwrap();
        r.handle.enqueue(owner, job_id);

        let job = wait_for_terminal(&r.store, job_id).await;
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.result_audio, Some(BlobKey::from("results/hello.wav")));
        assert_eq!(r.dispatcher.invocations(), 1);
        assert_eq!(r.credits.balance(owner).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn persistent_backend_errors_exhaust_the_budget() {
        let r = rig(
            ScriptedDispatcher::new(vec![backend_500(), backend_500(), backend_500()]),
            fast_config(3),
        );
        let owner = UserId::new();
        r.credits.grant(owner, 100).await.unwrap();

        let job_id = r.store.create(tts_spec(owner, "hello")).await.unwrap();
        r.handle.enqueue(owner, job_id);

        let job = wait_for_terminal(&r.store, job_id).await;
        assert_eq!(job.state, JobState::Failed);
        assert!(job.result_audio.is_none());
        // 1 attempt + 2 retries.
        assert_eq!(r.dispatcher.invocations(), 3);
        // Credits untouched on failure.
        assert_eq!(r.credits.balance(owner).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn transient_error_then_success_retries_with_same_payload() {
        let r = rig(
            ScriptedDispatcher::new(vec![backend_500(), Ok(BlobKey::from("results/retry.wav"))]),
            fast_config(3),
        );
        let owner = UserId::new();

        let job_id = r.store.create(tts_spec(owner, "hello")).await.unwrap();
        r.handle.enqueue(owner, job_id);

        let job = wait_for_terminal(&r.store, job_id).await;
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(r.dispatcher.invocations(), 2);
        let order = r.dispatcher.order.lock().unwrap().clone();
        assert_eq!(order, vec![job_id, job_id]);
    }

    #[tokio::test]
    async fn routing_errors_are_fatal_and_never_retried() {
        let r = rig(
            ScriptedDispatcher::new(vec![
                Err(DispatchError::Routing("unknown-service".to_string())),
            ]),
            fast_config(3),
        );
        let owner = UserId::new();
        r.credits.grant(owner, 100).await.unwrap();

        let job_id = r
            .store
            .create(
                JobSpec::validate(
                    owner,
                    Service::Unknown("unknown-service".to_string()),
                    Some("hello".to_string()),
                    None,
                    None,
                )
                .unwrap(),
            )
            .await
            .unwrap();
        r.handle.enqueue(owner, job_id);

        let job = wait_for_terminal(&r.store, job_id).await;
        assert_eq!(job.state, JobState::Failed);
        // Fatal on the first dispatch: the retry budget is never consulted.
        assert_eq!(r.dispatcher.invocations(), 1);
        assert_eq!(r.credits.balance(owner).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn terminal_jobs_are_never_reprocessed() {
        let r = rig(
            ScriptedDispatcher::new(vec![Ok(BlobKey::from("results/a.wav"))]),
            fast_config(3),
        );
        let owner = UserId::new();

        let job_id = r.store.create(tts_spec(owner, "hello")).await.unwrap();
        r.handle.enqueue(owner, job_id);
        let first = wait_for_terminal(&r.store, job_id).await;

        // Second pass over the same job: no new invocation, state unchanged.
        r.handle.enqueue(owner, job_id);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = r.store.load(job_id).await.unwrap();
        assert_eq!(second.state, first.state);
        assert_eq!(second.result_audio, first.result_audio);
        assert_eq!(r.dispatcher.invocations(), 1);
    }

    #[tokio::test]
    async fn per_owner_concurrency_is_bounded_and_fifo() {
        let r = rig(
            ScriptedDispatcher::new(vec![]).with_delay(Duration::from_millis(30)),
            fast_config(1),
        );
        let owner = UserId::new();

        let mut ids = Vec::new();
        for i in 0..4 {
            let id = r.store.create(tts_spec(owner, &format!("job {i}"))).await.unwrap();
            r.handle.enqueue(owner, id);
            ids.push(id);
        }

        for id in &ids {
            wait_for_terminal(&r.store, *id).await;
        }

        assert_eq!(r.dispatcher.peak_in_flight.load(Ordering::SeqCst), 1);
        // With a single lane slot, invocation order is submission order.
        let order = r.dispatcher.order.lock().unwrap().clone();
        assert_eq!(order, ids);
    }

    #[tokio::test]
    async fn owners_do_not_block_each_other() {
        let r = rig(
            ScriptedDispatcher::new(vec![]).with_delay(Duration::from_millis(30)),
            fast_config(1),
        );

        let mut ids = Vec::new();
        for _ in 0..3 {
            let owner = UserId::new();
            let id = r.store.create(tts_spec(owner, "hi")).await.unwrap();
            r.handle.enqueue(owner, id);
            ids.push(id);
        }

        for id in &ids {
            wait_for_terminal(&r.store, *id).await;
        }

        // Distinct owners run in parallel even with a per-owner limit of 1.
        assert!(r.dispatcher.peak_in_flight.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn attempt_timeout_counts_as_a_backend_error() {
        let config = OrchestratorConfig {
            per_owner_concurrency: 1,
            retry: RetryPolicy::no_retry(),
            attempt_timeout: Duration::from_millis(20),
            credit_cost: 50,
        };
        let r = rig(
            ScriptedDispatcher::new(vec![]).with_delay(Duration::from_millis(500)),
            config,
        );
        let owner = UserId::new();

        let job_id = r.store.create(tts_spec(owner, "slow")).await.unwrap();
        r.handle.enqueue(owner, job_id);

        let job = wait_for_terminal(&r.store, job_id).await;
        assert_eq!(job.state, JobState::Failed);
    }
}
