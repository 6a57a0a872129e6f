//! Detection pipeline orchestrator
//!
//! **Purpose:** Sequence decode → language resolution → feature extraction →
//! classification → explanation into one request-scoped operation with
//! explicit fallback behavior.
//!
//! # Stage progression
//! Received → Decoded → (LanguageResolved) → FeaturesExtracted → Classified →
//! Explained → Completed, with two terminal failure classes:
//!
//! - Client-attributable errors (undecodable payload, undeterminable
//!   language) propagate as [`PipelineError`].
//! - Any internal failure past decoding is absorbed into a
//!   [`PipelineOutcome::Degraded`] result: HUMAN at 0.50 with a
//!   processing-error explanation. The degraded answer is a visible, typed
//!   branch, and the root cause is logged before it is returned.

use std::sync::Arc;
use thiserror::Error;

use crate::models::{Classification, Language};
use crate::services::classifier::TrainedModel;
use crate::services::explainer::explain;
use crate::services::feature_extractor::{FeatureExtractor, SignalFeatureExtractor};
use crate::services::language_identifier::{identify_languages, LanguageModel};
use crate::utils::{decode_audio_bytes, DecodeError, Waveform};

/// Confidence reported by the degraded fallback result
const DEGRADED_CONFIDENCE: f64 = 0.5;

/// Client-attributable pipeline errors
///
/// These are the only errors that cross the pipeline boundary; everything
/// else is contained into a degraded outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Payload could not be decoded as audio
    #[error("Failed to decode audio: {0}")]
    Decode(#[from] DecodeError),

    /// Auto-detection was requested and no language cleared the gate
    #[error("Audio is not detectable")]
    UndeterminableLanguage,
}

/// Terminal output of a completed pipeline run
#[derive(Debug, Clone)]
pub struct DetectionOutput {
    /// Resolved language(s), explicit or detected, lexicographically ordered
    pub languages: Vec<Language>,
    pub classification: Classification,
    /// In [0,1], rounded to 2 decimal places
    pub confidence: f64,
    pub explanation: String,
}

/// Result of a pipeline run that produced an answer
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// All stages completed normally
    Completed(DetectionOutput),
    /// An internal stage failed; a defined default answer was substituted
    Degraded {
        output: DetectionOutput,
        /// Root cause, for logs and operability (not part of the wire contract)
        reason: String,
    },
}

impl PipelineOutcome {
    /// The answer to return to the caller, degraded or not
    pub fn output(&self) -> &DetectionOutput {
        match self {
            PipelineOutcome::Completed(output) => output,
            PipelineOutcome::Degraded { output, .. } => output,
        }
    }
}

/// Request-scoped pipeline over process-lifetime shared models
///
/// The classifier artifact and the language model are constructed once at
/// startup and injected here; the pipeline itself holds no mutable state and
/// runs may proceed concurrently across requests.
pub struct Pipeline {
    model: Arc<TrainedModel>,
    language_model: Arc<dyn LanguageModel>,
    extractor: Arc<dyn FeatureExtractor>,
}

impl Pipeline {
    /// Create a pipeline with the production feature extractor
    pub fn new(model: Arc<TrainedModel>, language_model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            language_model,
            extractor: Arc::new(SignalFeatureExtractor),
        }
    }

    /// Replace the feature extractor (failure-injection in tests)
    pub fn with_extractor(mut self, extractor: Arc<dyn FeatureExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Run the full pipeline on an encoded audio payload
    ///
    /// Language resolution is skipped entirely when the caller supplied a
    /// language. Decoding happens exactly once; the decoded waveform is
    /// request-scoped and dropped before this function returns.
    ///
    /// # Errors
    /// Only client-attributable conditions: `Decode` for unparsable payloads,
    /// `UndeterminableLanguage` when auto-detection finds nothing acceptable.
    pub fn run(
        &self,
        audio: &[u8],
        language: Option<Language>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let waveform = decode_audio_bytes(audio)?;

        let languages = match language {
            Some(language) => vec![language],
            None => {
                let detected = identify_languages(self.language_model.as_ref(), &waveform);
                if detected.is_empty() {
                    tracing::info!("No supported language cleared the confidence gate");
                    return Err(PipelineError::UndeterminableLanguage);
                }
                detected
            }
        };

        match self.analyze(&waveform) {
            Ok((classification, confidence, explanation)) => {
                Ok(PipelineOutcome::Completed(DetectionOutput {
                    languages,
                    classification,
                    confidence,
                    explanation,
                }))
            }
            Err(reason) => {
                tracing::error!(reason = %reason, "Pipeline degraded to fallback result");
                Ok(PipelineOutcome::Degraded {
                    output: DetectionOutput {
                        languages,
                        classification: Classification::Human,
                        confidence: DEGRADED_CONFIDENCE,
                        explanation: format!(
                            "Analysis uncertain due to processing error: {}",
                            reason
                        ),
                    },
                    reason,
                })
            }
        }
    }

    /// Extract → classify → explain; any failure is reported as a reason
    /// string for the degraded branch
    fn analyze(&self, waveform: &Waveform) -> Result<(Classification, f64, String), String> {
        let features = self
            .extractor
            .extract(waveform)
            .map_err(|e| e.to_string())?;
        let prediction = self.model.classify(&features);
        let explanation = explain(prediction.classification, &features);
        Ok((prediction.classification, prediction.confidence, explanation))
    }
}
