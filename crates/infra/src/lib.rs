//! Infrastructure layer: persistence, blob URLs, backend clients, and the
//! generation orchestrator.

pub mod backend;
pub mod blob;
pub mod credits;
pub mod orchestrator;
pub mod store;

pub use backend::{BackendConfig, BackendDispatcher, BackendError, DispatchError, HttpBackendDispatcher};
pub use blob::{BlobError, BlobGateway, InMemoryBlobGateway, SignedBlobGateway, SignedUrlConfig, UploadTarget};
pub use credits::{CreditError, CreditLedger, InMemoryCreditLedger};
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorHandle};
pub use store::{InMemoryJobStore, JobStore, JobStoreError};

#[cfg(feature = "postgres")]
pub use credits::PostgresCreditLedger;
#[cfg(feature = "postgres")]
pub use store::PostgresJobStore;
