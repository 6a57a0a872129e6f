//! Service modules for the voice-detection pipeline

pub mod classifier;
pub mod explainer;
pub mod feature_extractor;
pub mod language_identifier;
pub mod pipeline;

pub use classifier::{ClassPrediction, ModelError, TrainedModel};
pub use explainer::explain;
pub use feature_extractor::{ExtractError, FeatureExtractor, FeatureVector, SignalFeatureExtractor};
pub use language_identifier::{
    identify_languages, scan_windows, DisabledLanguageModel, LanguageError, LanguageModel,
    RawLanguageGuess, CONFIDENCE_THRESHOLD,
};
pub use pipeline::{DetectionOutput, Pipeline, PipelineError, PipelineOutcome};

#[cfg(feature = "whisper")]
pub use language_identifier::WhisperLanguageModel;
