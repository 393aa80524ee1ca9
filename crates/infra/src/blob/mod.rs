//! Blob gateway: time-boxed upload and fetch URLs for audio bytes.
//!
//! No bytes move through this process. Clients PUT uploads directly to the
//! issued URL; generated audio is materialized in storage by the synthesis
//! backends and only ever referenced here by key.

use std::time::Duration;

use async_trait::async_trait;

use audioforge_core::BlobKey;

mod memory;
mod signed;

pub use memory::InMemoryBlobGateway;
pub use signed::{SignedBlobGateway, SignedUrlConfig};

/// Audio MIME types accepted for voice-conversion source uploads.
pub const ALLOWED_UPLOAD_TYPES: &[&str] = &["audio/mpeg", "audio/mp3", "audio/wav"];

/// A time-boxed direct-write target plus the durable key to attach to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub upload_url: String,
    pub key: BlobKey,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BlobError {
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("blob not found")]
    NotFound,
    #[error("gateway error: {0}")]
    Gateway(String),
}

/// Issues presigned-style URLs for stored audio.
#[async_trait]
pub trait BlobGateway: Send + Sync {
    /// Issue a time-boxed direct-upload URL for the given content type.
    ///
    /// Fails with [`BlobError::UnsupportedContentType`] unless the type is in
    /// [`ALLOWED_UPLOAD_TYPES`].
    async fn issue_upload_target(&self, content_type: &str) -> Result<UploadTarget, BlobError>;

    /// Produce a fresh time-boxed read URL for a stored blob.
    ///
    /// URLs expire and are re-derived on every call; they are never cached
    /// or persisted.
    async fn resolve_fetch_url(&self, key: &BlobKey, ttl: Duration) -> Result<String, BlobError>;
}

/// File extension for an allowed upload content type.
pub(crate) fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/wav" => Some("wav"),
        _ => None,
    }
}
