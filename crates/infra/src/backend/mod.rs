//! Synthesis backend dispatch.

use async_trait::async_trait;

use audioforge_core::BlobKey;
use audioforge_generation::GenerationJob;

mod http;

pub use http::{BackendConfig, HttpBackendDispatcher};

/// Failure of a single backend invocation (non-2xx, transport, timeout).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("backend call failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
pub struct BackendError {
    /// HTTP status when the backend answered; `None` on transport failure.
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

/// Dispatch error as seen by the orchestrator.
///
/// Routing errors are fatal (the job fails with no retry); backend errors
/// are transient and consume the retry budget. The dispatcher never decides
/// retry itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("no backend route for service: {0}")]
    Routing(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Maps a job's declared service to an external synthesis API and performs
/// the call. On success the backend has already materialized the result in
/// storage; the returned key is used verbatim, never re-uploaded.
#[async_trait]
pub trait BackendDispatcher: Send + Sync {
    async fn invoke(&self, job: &GenerationJob) -> Result<BlobKey, DispatchError>;
}
