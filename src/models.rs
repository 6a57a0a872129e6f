//! Wire-level data models for voxcheck
//!
//! Request/response types for the detection endpoint, plus the two
//! enumerations shared across the pipeline (supported languages and
//! classification labels).

use serde::{Deserialize, Serialize};

/// Supported spoken languages
///
/// The detection endpoint accepts exactly these five values; automatic
/// identification maps ISO 639-1 codes onto them via [`Language::from_iso_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Tamil,
    English,
    Hindi,
    Malayalam,
    Telugu,
}

impl Language {
    /// Human-readable name (also the wire representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Tamil => "Tamil",
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Malayalam => "Malayalam",
            Language::Telugu => "Telugu",
        }
    }

    /// Map an ISO 639-1 code to a supported language
    ///
    /// Codes outside the fixed table are unsupported and return `None`.
    pub fn from_iso_code(code: &str) -> Option<Language> {
        match code {
            "ta" => Some(Language::Tamil),
            "en" => Some(Language::English),
            "hi" => Some(Language::Hindi),
            "ml" => Some(Language::Malayalam),
            "te" => Some(Language::Telugu),
            _ => None,
        }
    }

    /// Join multiple languages into a single response string ("Hindi, Tamil")
    pub fn join(languages: &[Language]) -> String {
        languages
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification labels produced by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Human,
    AiGenerated,
}

impl Classification {
    /// Wire representation ("HUMAN" / "AI_GENERATED")
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Human => "HUMAN",
            Classification::AiGenerated => "AI_GENERATED",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// POST /api/voice-detection request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDetectionRequest {
    /// Explicit language selection; when absent the service auto-detects
    #[serde(default)]
    pub language: Option<Language>,
    /// Payload encoding; only "mp3" is accepted
    pub audio_format: String,
    /// Base64-encoded audio bytes
    pub audio_base64: String,
}

/// POST /api/voice-detection response body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDetectionResponse {
    pub status: String,
    /// Resolved language(s); multiple detections are comma-joined
    pub language: String,
    pub classification: Classification,
    /// Probability mass of the chosen label, rounded to 2 decimal places
    pub confidence_score: f64,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_wire_names() {
        assert_eq!(
            serde_json::to_string(&Classification::AiGenerated).unwrap(),
            "\"AI_GENERATED\""
        );
        assert_eq!(
            serde_json::to_string(&Classification::Human).unwrap(),
            "\"HUMAN\""
        );
    }

    #[test]
    fn test_language_iso_mapping() {
        assert_eq!(Language::from_iso_code("ml"), Some(Language::Malayalam));
        assert_eq!(Language::from_iso_code("ta"), Some(Language::Tamil));
        assert_eq!(Language::from_iso_code("fr"), None);
        assert_eq!(Language::from_iso_code(""), None);
    }

    #[test]
    fn test_language_join() {
        assert_eq!(
            Language::join(&[Language::Hindi, Language::Tamil]),
            "Hindi, Tamil"
        );
        assert_eq!(Language::join(&[]), "");
    }

    #[test]
    fn test_request_parsing() {
        let body = r#"{"language":"Telugu","audioFormat":"mp3","audioBase64":"AAAA"}"#;
        let req: VoiceDetectionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.language, Some(Language::Telugu));
        assert_eq!(req.audio_format, "mp3");

        // Language is optional
        let body = r#"{"audioFormat":"mp3","audioBase64":"AAAA"}"#;
        let req: VoiceDetectionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.language, None);
    }
}
