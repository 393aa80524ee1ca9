use serde::{Deserialize, Serialize};

use audioforge_core::JobId;
use audioforge_generation::{GenerationJob, Service};

#[derive(Debug, Deserialize)]
pub struct SubmitGenerationRequest {
    pub service: Service,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub source_audio_key: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitGenerationResponse {
    pub job_id: JobId,
    pub should_warn_throttle: bool,
}

/// Poller contract: the status string is the only field a pending or
/// failed job carries; a succeeded job adds its fetch URL.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatusResponse {
    Pending,
    Succeeded { audio_url: String },
    Failed,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub upload_url: String,
    pub s3_key: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    pub id: JobId,
    pub title: String,
    pub audio_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub balance: i64,
}

/// Display title for a history entry. Voice conversions have no input
/// text, so they are titled after the target voice instead.
pub fn history_title(job: &GenerationJob) -> String {
    if job.service == Service::VoiceConversion {
        let voice = job.target_voice.as_deref().unwrap_or("unknown voice");
        return format!("Voice conversion to {voice}");
    }

    match job.input_text.as_deref() {
        Some(text) if text.chars().count() > 50 => {
            let truncated: String = text.chars().take(50).collect();
            format!("{truncated}...")
        }
        Some(text) => text.to_string(),
        None => "Generated clip".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioforge_core::UserId;
    use audioforge_generation::JobSpec;

    fn job_for(service: Service, text: Option<&str>, voice: Option<&str>) -> GenerationJob {
        let spec = JobSpec {
            owner_id: UserId::new(),
            service,
            input_text: text.map(str::to_string),
            source_audio: Some("voice-uploads/a.wav".into()),
            target_voice: voice.map(str::to_string),
        };
        GenerationJob::new(spec)
    }

    #[test]
    fn short_text_is_the_title() {
        let job = job_for(Service::TextToSpeech, Some("hello world"), Some("andreas"));
        assert_eq!(history_title(&job), "hello world");
    }

    #[test]
    fn long_text_is_truncated_at_fifty_chars() {
        let text = "a".repeat(80);
        let job = job_for(Service::SoundEffect, Some(&text), None);
        let title = history_title(&job);
        assert_eq!(title, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn voice_conversions_are_titled_after_the_target_voice() {
        let job = job_for(Service::VoiceConversion, None, Some("trump"));
        assert_eq!(history_title(&job), "Voice conversion to trump");
    }
}
