//! Synthesis service selector.

use serde::{Deserialize, Serialize};

/// Which external synthesis backend a job targets.
///
/// Serialized as a plain string (`"text_to_speech"`, ...). Unrecognized
/// strings round-trip as [`Service::Unknown`] rather than failing
/// deserialization: a submission with an unknown service still produces a
/// durable job record, which the orchestrator then fails with a routing
/// error and zero backend invocations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Service {
    /// Text synthesis (requires input text + target voice).
    TextToSpeech,
    /// Voice conversion (requires uploaded source audio + target voice).
    VoiceConversion,
    /// Sound-effect synthesis from a text prompt.
    SoundEffect,
    /// Anything else; carried verbatim so routing can report it.
    Unknown(String),
}

impl Service {
    pub fn as_str(&self) -> &str {
        match self {
            Service::TextToSpeech => "text_to_speech",
            Service::VoiceConversion => "voice_conversion",
            Service::SoundEffect => "sound_effect",
            Service::Unknown(s) => s,
        }
    }

    /// True for the services the dispatcher can route.
    pub fn is_known(&self) -> bool {
        !matches!(self, Service::Unknown(_))
    }

    /// Whether this service consumes input text (vs. source audio).
    pub fn takes_text(&self) -> bool {
        matches!(self, Service::TextToSpeech | Service::SoundEffect)
    }
}

impl From<String> for Service {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text_to_speech" => Service::TextToSpeech,
            "voice_conversion" => Service::VoiceConversion,
            "sound_effect" => Service::SoundEffect,
            _ => Service::Unknown(value),
        }
    }
}

impl From<Service> for String {
    fn from(value: Service) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for Service {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
