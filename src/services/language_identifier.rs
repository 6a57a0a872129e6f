//! Automatic spoken-language identification
//!
//! **Purpose:** Estimate which supported language(s) a clip is spoken in when
//! the caller did not supply one.
//!
//! The identification model is a black box behind the [`LanguageModel`] trait:
//! samples in, raw ISO code + probability out. Everything around it — scan
//! window layout, the confidence gate, the ISO-code lookup, and multi-window
//! aggregation — is pure and unit-testable with a stubbed model.
//!
//! A clip may contain code-switching, so long clips are probed at several
//! scan points and the result is the set of distinct accepted languages, not
//! just the first match.

use thiserror::Error;

use crate::models::Language;
use crate::utils::Waveform;

/// Minimum model probability for a detection to be accepted
pub const CONFIDENCE_THRESHOLD: f32 = 0.4;

/// Clips at or below this length are identified in a single pass (seconds)
const SINGLE_SCAN_MAX_SECONDS: f64 = 12.0;

/// Window length for each scan point on long clips (seconds)
const SCAN_WINDOW_SECONDS: f64 = 10.0;

/// Language identification errors
#[derive(Debug, Error)]
pub enum LanguageError {
    /// Model initialization failed (fatal at startup, never per-request)
    #[error("Failed to initialize language model: {0}")]
    Init(String),

    /// Model inference failed on a scan window
    #[error("Language model failure: {0}")]
    Model(String),
}

/// Raw model output before gating and code mapping
#[derive(Debug, Clone)]
pub struct RawLanguageGuess {
    /// ISO 639-1 language code as reported by the model
    pub code: String,
    /// Reported probability in [0,1]
    pub probability: f32,
}

/// Black-box language identification model
///
/// One shared, read-only instance lives for the process lifetime; inference
/// may block the calling execution for the duration of computation.
pub trait LanguageModel: Send + Sync {
    /// Identify the dominant language of the given mono samples
    ///
    /// Returns `None` when the model has no estimate at all (as opposed to a
    /// low-confidence estimate, which is returned and gated by the caller).
    fn identify(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Option<RawLanguageGuess>, LanguageError>;
}

/// Scan windows as (start_seconds, length_seconds) pairs
///
/// Short clips get a single whole-clip window. Longer clips are probed at
/// three representative points (start, middle, near-end) to avoid biasing the
/// result on a single excerpt.
pub fn scan_windows(duration_seconds: f64) -> Vec<(f64, f64)> {
    if duration_seconds <= 0.0 {
        return Vec::new();
    }
    if duration_seconds <= SINGLE_SCAN_MAX_SECONDS {
        return vec![(0.0, duration_seconds)];
    }

    let last_start = duration_seconds - SCAN_WINDOW_SECONDS;
    vec![
        (0.0, SCAN_WINDOW_SECONDS),
        (last_start / 2.0, SCAN_WINDOW_SECONDS),
        (last_start, SCAN_WINDOW_SECONDS),
    ]
}

/// Identify the set of supported languages spoken in a clip
///
/// **Algorithm:**
/// 1. Lay out scan windows over the clip duration
/// 2. Run the model independently on each window
/// 3. Accept a detection only when its probability exceeds
///    [`CONFIDENCE_THRESHOLD`] and its code maps to a supported language
/// 4. Aggregate distinct accepted languages, sorted lexicographically
///
/// A model failure on one window contributes nothing rather than failing the
/// whole identification. An empty result means no supported language cleared
/// the gate; the orchestrator surfaces that as a client-facing error.
pub fn identify_languages(model: &dyn LanguageModel, waveform: &Waveform) -> Vec<Language> {
    let duration = waveform.duration_seconds();
    let mut accepted: Vec<Language> = Vec::new();

    for (start, len) in scan_windows(duration) {
        let begin = (start * waveform.sample_rate as f64) as usize;
        let end = ((start + len) * waveform.sample_rate as f64) as usize;
        let end = end.min(waveform.samples.len());
        if begin >= end {
            continue;
        }

        let guess = match model.identify(&waveform.samples[begin..end], waveform.sample_rate) {
            Ok(guess) => guess,
            Err(e) => {
                tracing::warn!(
                    window_start = format!("{:.1}", start),
                    error = %e,
                    "Language model failed on scan window"
                );
                continue;
            }
        };

        let Some(guess) = guess else { continue };

        match Language::from_iso_code(&guess.code) {
            Some(language) if guess.probability > CONFIDENCE_THRESHOLD => {
                tracing::debug!(
                    code = %guess.code,
                    language = %language,
                    probability = format!("{:.2}", guess.probability),
                    "Accepted language detection"
                );
                accepted.push(language);
            }
            Some(language) => {
                tracing::debug!(
                    language = %language,
                    probability = format!("{:.2}", guess.probability),
                    "Rejected low-confidence detection"
                );
            }
            None => {
                tracing::debug!(code = %guess.code, "Unsupported language code");
            }
        }
    }

    accepted.sort_by_key(|l| l.as_str());
    accepted.dedup();
    accepted
}

/// Placeholder model for builds without the `whisper` feature
///
/// Every inference fails, so automatic identification always resolves to
/// "none" and the caller receives the undeterminable-language error. Explicit
/// language selection is unaffected.
pub struct DisabledLanguageModel;

impl LanguageModel for DisabledLanguageModel {
    fn identify(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
    ) -> Result<Option<RawLanguageGuess>, LanguageError> {
        Err(LanguageError::Model(
            "language identification backend not compiled in (enable the `whisper` feature)"
                .to_string(),
        ))
    }
}

#[cfg(feature = "whisper")]
pub use self::whisper_model::WhisperLanguageModel;

#[cfg(feature = "whisper")]
mod whisper_model {
    use super::{LanguageError, LanguageModel, RawLanguageGuess};
    use rubato::{FastFixedIn, PolynomialDegree, Resampler};
    use std::path::Path;
    use whisper_rs::{WhisperContext, WhisperContextParameters};

    /// Sample rate expected by whisper.cpp
    const WHISPER_SAMPLE_RATE: u32 = 16000;

    /// Language model backed by a pretrained whisper.cpp GGML artifact
    ///
    /// Expensive to initialize; constructed once at startup and shared.
    pub struct WhisperLanguageModel {
        ctx: WhisperContext,
    }

    impl WhisperLanguageModel {
        /// Load the GGML model from disk
        ///
        /// Initialization failure is a configuration-fatal condition.
        pub fn load(model_path: &Path) -> Result<Self, LanguageError> {
            tracing::info!(path = %model_path.display(), "Loading whisper language model");
            let ctx = WhisperContext::new_with_params(
                model_path
                    .to_str()
                    .ok_or_else(|| LanguageError::Init("non-UTF8 model path".to_string()))?,
                WhisperContextParameters::default(),
            )
            .map_err(|e| LanguageError::Init(e.to_string()))?;
            tracing::info!("Whisper language model loaded");
            Ok(Self { ctx })
        }

        fn to_whisper_rate(samples: &[f32], sample_rate: u32) -> Result<Vec<f32>, LanguageError> {
            if sample_rate == WHISPER_SAMPLE_RATE {
                return Ok(samples.to_vec());
            }
            let mut resampler = FastFixedIn::<f32>::new(
                WHISPER_SAMPLE_RATE as f64 / sample_rate as f64,
                1.0,
                PolynomialDegree::Septic,
                samples.len(),
                1,
            )
            .map_err(|e| LanguageError::Model(e.to_string()))?;
            let mut output = resampler
                .process(&[samples.to_vec()], None)
                .map_err(|e| LanguageError::Model(e.to_string()))?;
            Ok(output.remove(0))
        }
    }

    impl LanguageModel for WhisperLanguageModel {
        fn identify(
            &self,
            samples: &[f32],
            sample_rate: u32,
        ) -> Result<Option<RawLanguageGuess>, LanguageError> {
            let samples = Self::to_whisper_rate(samples, sample_rate)?;

            let mut state = self
                .ctx
                .create_state()
                .map_err(|e| LanguageError::Model(e.to_string()))?;
            state
                .pcm_to_mel(&samples, 1)
                .map_err(|e| LanguageError::Model(e.to_string()))?;

            let (_top_id, probs) = state
                .lang_detect(0, 1)
                .map_err(|e| LanguageError::Model(e.to_string()))?;

            let best = probs
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));

            let Some((lang_id, &probability)) = best else {
                return Ok(None);
            };

            let code = whisper_rs::get_lang_str(lang_id as i32)
                .ok_or_else(|| LanguageError::Model("unknown language id".to_string()))?;

            Ok(Some(RawLanguageGuess {
                code: code.to_string(),
                probability,
            }))
        }
    }
}
