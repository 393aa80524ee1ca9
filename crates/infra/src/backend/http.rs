//! HTTP client for the three synthesis services.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use audioforge_core::BlobKey;
use audioforge_generation::{GenerationJob, Service};

use super::{BackendDispatcher, BackendError, DispatchError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Endpoints and shared credential for the synthesis backends.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Text-to-speech service base URL (POST `/generate`).
    pub tts_url: String,
    /// Voice-conversion service base URL (POST `/convert`).
    pub vc_url: String,
    /// Sound-effect service base URL (POST `/generate`).
    pub sfx_url: String,
    /// Shared credential sent in the `Authorization` header.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(
        tts_url: impl Into<String>,
        vc_url: impl Into<String>,
        sfx_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            tts_url: tts_url.into(),
            vc_url: vc_url.into(),
            sfx_url: sfx_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Success body shared by all three services. The `s3_key` already
/// addresses the materialized audio and becomes the job's result key.
#[derive(Debug, Deserialize)]
struct SynthesisResponse {
    #[allow(dead_code)]
    audio_url: String,
    s3_key: String,
}

/// Reqwest-based dispatcher over [`BackendConfig`].
#[derive(Debug, Clone)]
pub struct HttpBackendDispatcher {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackendDispatcher {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Select endpoint and payload by service. Unknown services and jobs
    /// missing their routed input are routing errors (fatal, no retry).
    fn route(&self, job: &GenerationJob) -> Result<(String, serde_json::Value), DispatchError> {
        let base = |url: &str| url.trim_end_matches('/').to_string();

        match &job.service {
            Service::TextToSpeech => {
                let text = job
                    .input_text
                    .as_deref()
                    .ok_or_else(|| DispatchError::Routing("text_to_speech job has no input text".into()))?;
                let voice = job
                    .target_voice
                    .as_deref()
                    .ok_or_else(|| DispatchError::Routing("text_to_speech job has no target voice".into()))?;
                Ok((
                    format!("{}/generate", base(&self.config.tts_url)),
                    json!({ "text": text, "target_voice": voice }),
                ))
            }
            Service::VoiceConversion => {
                let source = job
                    .source_audio
                    .as_ref()
                    .ok_or_else(|| DispatchError::Routing("voice_conversion job has no source audio".into()))?;
                let voice = job
                    .target_voice
                    .as_deref()
                    .ok_or_else(|| DispatchError::Routing("voice_conversion job has no target voice".into()))?;
                Ok((
                    format!("{}/convert", base(&self.config.vc_url)),
                    json!({ "source_audio_key": source.as_str(), "target_voice": voice }),
                ))
            }
            Service::SoundEffect => {
                let prompt = job
                    .input_text
                    .as_deref()
                    .ok_or_else(|| DispatchError::Routing("sound_effect job has no prompt".into()))?;
                Ok((
                    format!("{}/generate", base(&self.config.sfx_url)),
                    json!({ "prompt": prompt }),
                ))
            }
            Service::Unknown(name) => Err(DispatchError::Routing(name.clone())),
        }
    }
}

#[async_trait]
impl BackendDispatcher for HttpBackendDispatcher {
    async fn invoke(&self, job: &GenerationJob) -> Result<BlobKey, DispatchError> {
        let (url, payload) = self.route(job)?;

        debug!(job_id = %job.id, service = %job.service, url = %url, "invoking synthesis backend");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, &self.config.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| BackendError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Backend(BackendError {
                status: Some(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("backend returned an error")
                    .to_string(),
            }));
        }

        let body: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| BackendError::transport(format!("invalid backend response: {e}")))?;

        Ok(BlobKey::new(body.s3_key))
    }
}
