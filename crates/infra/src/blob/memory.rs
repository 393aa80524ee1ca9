//! In-memory blob gateway for tests/dev.

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use audioforge_core::BlobKey;

use super::{ALLOWED_UPLOAD_TYPES, BlobError, BlobGateway, UploadTarget, extension_for};

/// In-memory gateway that tracks which keys exist, so `NotFound` is exact.
#[derive(Debug, Default)]
pub struct InMemoryBlobGateway {
    keys: RwLock<HashSet<String>>,
}

impl InMemoryBlobGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key that was materialized outside the gateway (e.g. a
    /// synthesis backend's result).
    pub fn insert(&self, key: impl Into<String>) {
        self.keys.write().unwrap().insert(key.into());
    }

    pub fn contains(&self, key: &BlobKey) -> bool {
        self.keys.read().unwrap().contains(key.as_str())
    }
}

#[async_trait]
impl BlobGateway for InMemoryBlobGateway {
    async fn issue_upload_target(&self, content_type: &str) -> Result<UploadTarget, BlobError> {
        if !ALLOWED_UPLOAD_TYPES.contains(&content_type) {
            return Err(BlobError::UnsupportedContentType(content_type.to_string()));
        }
        let ext = extension_for(content_type)
            .ok_or_else(|| BlobError::UnsupportedContentType(content_type.to_string()))?;

        let key = format!("voice-uploads/{}.{ext}", Uuid::new_v4());
        self.keys.write().unwrap().insert(key.clone());

        Ok(UploadTarget {
            upload_url: format!("memory://uploads/{key}?token={}", Uuid::new_v4().simple()),
            key: BlobKey::new(key),
        })
    }

    async fn resolve_fetch_url(&self, key: &BlobKey, ttl: Duration) -> Result<String, BlobError> {
        if !self.contains(key) {
            return Err(BlobError::NotFound);
        }
        Ok(format!(
            "memory://fetch/{key}?ttl={}&token={}",
            ttl.as_secs(),
            Uuid::new_v4().simple()
        ))
    }
}
