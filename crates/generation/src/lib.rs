//! `audioforge-generation`: generation pipeline domain.
//!
//! Pure domain types for the asynchronous audio generation pipeline: the job
//! entity and its lifecycle, submission validation, the advisory throttle
//! policy, and the retry policy applied by the orchestrator. No I/O here.

pub mod job;
pub mod retry;
pub mod service;
pub mod throttle;

pub use job::{GenerationJob, JobSpec, JobState};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use service::Service;
pub use throttle::ThrottlePolicy;
