//! The generation job entity and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use audioforge_core::{BlobKey, DomainError, DomainResult, JobId, UserId};

use crate::service::Service;

/// Lifecycle state of a generation job.
///
/// `Pending → Succeeded` and `Pending → Failed` are the only transitions;
/// both targets are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, not yet resolved by the orchestrator.
    Pending,
    /// Backend produced audio; `result_audio` is set.
    Succeeded,
    /// Routing failed or the retry budget was exhausted.
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Validated submission input for a new job.
///
/// Construct via [`JobSpec::validate`]; the job store only accepts specs, so
/// a malformed submission is rejected before any row exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub owner_id: UserId,
    pub service: Service,
    pub input_text: Option<String>,
    pub source_audio: Option<BlobKey>,
    pub target_voice: Option<String>,
}

impl JobSpec {
    /// Validate the one-of-input invariant for the declared service.
    ///
    /// Text services (`text_to_speech`, `sound_effect`) require non-empty
    /// input text and no source audio; voice conversion requires source
    /// audio and no text. An unknown service is accepted here; it becomes
    /// a durable job that the orchestrator fails at routing time.
    pub fn validate(
        owner_id: UserId,
        service: Service,
        input_text: Option<String>,
        source_audio: Option<BlobKey>,
        target_voice: Option<String>,
    ) -> DomainResult<Self> {
        let text = input_text.filter(|t| !t.trim().is_empty());
        let audio = source_audio.filter(|k| !k.is_empty());

        if text.is_some() && audio.is_some() {
            return Err(DomainError::invalid_spec(
                "provide either input text or source audio, not both",
            ));
        }

        match &service {
            Service::TextToSpeech => {
                if text.is_none() {
                    return Err(DomainError::invalid_spec(
                        "text_to_speech requires input text",
                    ));
                }
                if target_voice.is_none() {
                    return Err(DomainError::invalid_spec(
                        "text_to_speech requires a target voice",
                    ));
                }
            }
            Service::SoundEffect => {
                if text.is_none() {
                    return Err(DomainError::invalid_spec("sound_effect requires a prompt"));
                }
            }
            Service::VoiceConversion => {
                if audio.is_none() {
                    return Err(DomainError::invalid_spec(
                        "voice_conversion requires source audio",
                    ));
                }
                if target_voice.is_none() {
                    return Err(DomainError::invalid_spec(
                        "voice_conversion requires a target voice",
                    ));
                }
            }
            // Routed (and failed) downstream; no field shape to enforce.
            Service::Unknown(_) => {}
        }

        Ok(Self {
            owner_id,
            service,
            input_text: text,
            source_audio: audio,
            target_voice,
        })
    }
}

/// One generation request and its lifecycle record.
///
/// The submission path writes the initial fields once; the orchestrator is
/// the sole writer of `state` and `result_audio`, exactly once per job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub owner_id: UserId,
    pub service: Service,
    pub input_text: Option<String>,
    pub source_audio: Option<BlobKey>,
    pub target_voice: Option<String>,
    pub state: JobState,
    pub result_audio: Option<BlobKey>,
    /// Immutable after creation; anchors throttle-window and history queries.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Create a new pending job from a validated spec.
    pub fn new(spec: JobSpec) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            owner_id: spec.owner_id,
            service: spec.service,
            input_text: spec.input_text,
            source_audio: spec.source_audio,
            target_voice: spec.target_voice,
            state: JobState::Pending,
            result_audio: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to `Succeeded` with the backend's result key.
    ///
    /// Returns `false` (leaving the job untouched) if the job is already
    /// terminal: terminal states are never revisited.
    pub fn mark_succeeded(&mut self, result: BlobKey) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Succeeded;
        self.result_audio = Some(result);
        self.updated_at = Utc::now();
        true
    }

    /// Transition to `Failed`. Returns `false` if already terminal.
    pub fn mark_failed(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Failed;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn owner() -> UserId {
        UserId::new()
    }

    fn tts_spec() -> JobSpec {
        JobSpec::validate(
            owner(),
            Service::TextToSpeech,
            Some("hello".to_string()),
            None,
            Some("andreas".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn new_job_is_pending_with_matching_fields() {
        let spec = tts_spec();
        let job = GenerationJob::new(spec.clone());

        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.owner_id, spec.owner_id);
        assert_eq!(job.service, Service::TextToSpeech);
        assert_eq!(job.input_text.as_deref(), Some("hello"));
        assert_eq!(job.target_voice.as_deref(), Some("andreas"));
        assert!(job.result_audio.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn voice_conversion_without_source_audio_is_invalid() {
        let err = JobSpec::validate(
            owner(),
            Service::VoiceConversion,
            None,
            None,
            Some("andreas".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSpec(_)));
    }

    #[test]
    fn text_services_without_text_are_invalid() {
        for service in [Service::TextToSpeech, Service::SoundEffect] {
            let err = JobSpec::validate(owner(), service, None, None, None).unwrap_err();
            assert!(matches!(err, DomainError::InvalidSpec(_)));
        }
    }

    #[test]
    fn empty_text_counts_as_missing() {
        let err = JobSpec::validate(
            owner(),
            Service::SoundEffect,
            Some("   ".to_string()),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSpec(_)));
    }

    #[test]
    fn both_inputs_is_invalid() {
        let err = JobSpec::validate(
            owner(),
            Service::VoiceConversion,
            Some("hello".to_string()),
            Some(BlobKey::from("voice-uploads/a.wav")),
            Some("andreas".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidSpec(_)));
    }

    #[test]
    fn unknown_service_spec_is_accepted() {
        let spec = JobSpec::validate(
            owner(),
            Service::Unknown("unknown-service".to_string()),
            Some("hello".to_string()),
            None,
            None,
        )
        .unwrap();
        assert!(!spec.service.is_known());
    }

    #[test]
    fn terminal_states_never_regress() {
        let mut job = GenerationJob::new(tts_spec());
        assert!(job.mark_succeeded(BlobKey::from("results/a.wav")));

        assert!(!job.mark_failed());
        assert_eq!(job.state, JobState::Succeeded);
        assert_eq!(job.result_audio, Some(BlobKey::from("results/a.wav")));

        assert!(!job.mark_succeeded(BlobKey::from("results/b.wav")));
        assert_eq!(job.result_audio, Some(BlobKey::from("results/a.wav")));

        let mut job = GenerationJob::new(tts_spec());
        assert!(job.mark_failed());
        assert!(!job.mark_succeeded(BlobKey::from("results/c.wav")));
        assert_eq!(job.state, JobState::Failed);
        assert!(job.result_audio.is_none());
    }

    proptest! {
        // Any sequence of transition attempts after the first terminal one
        // leaves state and result untouched.
        #[test]
        fn state_is_monotonic(later in proptest::collection::vec(any::<bool>(), 0..8), first in any::<bool>()) {
            let mut job = GenerationJob::new(tts_spec());
            if first {
                job.mark_succeeded(BlobKey::from("results/first.wav"));
            } else {
                job.mark_failed();
            }
            let state = job.state;
            let result = job.result_audio.clone();

            for succeed in later {
                if succeed {
                    prop_assert!(!job.mark_succeeded(BlobKey::from("results/again.wav")));
                } else {
                    prop_assert!(!job.mark_failed());
                }
                prop_assert_eq!(job.state, state);
                prop_assert_eq!(&job.result_audio, &result);
            }
        }
    }
}
