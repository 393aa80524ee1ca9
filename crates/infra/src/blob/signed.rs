//! Locally-signed presigned-style URLs.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use audioforge_core::BlobKey;

use super::{ALLOWED_UPLOAD_TYPES, BlobError, BlobGateway, UploadTarget, extension_for};

/// Configuration for [`SignedBlobGateway`].
#[derive(Debug, Clone)]
pub struct SignedUrlConfig {
    /// Storage endpoint, e.g. `https://storage.example.com`.
    pub base_url: String,
    /// Bucket name.
    pub bucket: String,
    /// Shared signing secret.
    pub secret: String,
    /// Validity of issued upload URLs.
    pub upload_ttl: Duration,
}

impl SignedUrlConfig {
    fn url_for(&self, key: &str, query: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/{bucket}/{key}?{query}", bucket = self.bucket)
    }
}

/// Blob gateway that signs storage URLs locally.
///
/// The signature covers verb, bucket, key, expiry, and a per-call nonce, so
/// two resolutions of the same key never produce the same URL. Existence of
/// a key is the storage service's concern; this gateway only rejects
/// structurally invalid references.
#[derive(Debug, Clone)]
pub struct SignedBlobGateway {
    config: SignedUrlConfig,
}

impl SignedBlobGateway {
    pub fn new(config: SignedUrlConfig) -> Self {
        Self { config }
    }

    fn sign(&self, verb: &str, key: &str, expires: i64, nonce: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.config.secret.as_bytes());
        hasher.update(b"\n");
        hasher.update(verb.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.config.bucket.as_bytes());
        hasher.update(b"\n");
        hasher.update(key.as_bytes());
        hasher.update(b"\n");
        hasher.update(expires.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(nonce.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    fn signed_url(&self, verb: &str, key: &str, ttl: Duration) -> String {
        let expires = (Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default()).timestamp();
        let nonce = Uuid::new_v4().simple().to_string();
        let signature = self.sign(verb, key, expires, &nonce);
        self.config.url_for(
            key,
            &format!("verb={verb}&expires={expires}&nonce={nonce}&signature={signature}"),
        )
    }
}

fn validate_key(key: &BlobKey) -> Result<(), BlobError> {
    let s = key.as_str();
    if s.is_empty() || s.starts_with('/') || s.split('/').any(|seg| seg.is_empty() || seg == "..") {
        return Err(BlobError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl BlobGateway for SignedBlobGateway {
    async fn issue_upload_target(&self, content_type: &str) -> Result<UploadTarget, BlobError> {
        if !ALLOWED_UPLOAD_TYPES.contains(&content_type) {
            return Err(BlobError::UnsupportedContentType(content_type.to_string()));
        }
        let ext = extension_for(content_type)
            .ok_or_else(|| BlobError::UnsupportedContentType(content_type.to_string()))?;

        let key = format!("voice-uploads/{}.{ext}", Uuid::new_v4());
        let upload_url = self.signed_url("PUT", &key, self.config.upload_ttl);

        Ok(UploadTarget {
            upload_url,
            key: BlobKey::new(key),
        })
    }

    async fn resolve_fetch_url(&self, key: &BlobKey, ttl: Duration) -> Result<String, BlobError> {
        validate_key(key)?;
        Ok(self.signed_url("GET", key.as_str(), ttl))
    }
}
