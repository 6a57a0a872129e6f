//! Explanation synthesis
//!
//! **Purpose:** Derive a short natural-language rationale from the predicted
//! label and the feature values backing it.
//!
//! Each label has a fixed predicate set; the true predicates are joined into
//! a sentence fragment, with a generic fallback when none hold.

use crate::models::Classification;
use crate::services::feature_extractor::FeatureVector;

// Human evidence thresholds
const HUMAN_PITCH_STD_MIN: f64 = 20.0;
const HUMAN_SILENCE_RATIO_MIN: f64 = 0.1;
const HUMAN_FLATNESS_MIN: f64 = 0.02;

// AI evidence thresholds
const AI_PITCH_STD_MAX: f64 = 15.0;
const AI_SILENCE_RATIO_MAX: f64 = 0.08;
const AI_FLATNESS_MAX: f64 = 0.015;

/// Produce a rationale for a classification
///
/// True predicates for the predicted label are joined with " and "; when none
/// hold, a generic label-appropriate phrase is returned.
pub fn explain(classification: Classification, features: &FeatureVector) -> String {
    let mut reasons: Vec<&str> = Vec::new();

    match classification {
        Classification::Human => {
            if features.pitch_std > HUMAN_PITCH_STD_MIN {
                reasons.push("Natural pitch variability");
            }
            if features.silence_ratio > HUMAN_SILENCE_RATIO_MIN {
                reasons.push("Human breathing patterns");
            }
            if features.spectral_flatness > HUMAN_FLATNESS_MIN {
                reasons.push("Complex spectral characteristics");
            }
            if reasons.is_empty() {
                return "Natural speech patterns detected".to_string();
            }
        }
        Classification::AiGenerated => {
            if features.pitch_std < AI_PITCH_STD_MAX {
                reasons.push("Monotonic pitch");
            }
            if features.silence_ratio < AI_SILENCE_RATIO_MAX {
                reasons.push("No natural pauses");
            }
            if features.spectral_flatness < AI_FLATNESS_MAX {
                reasons.push("Overly clean audio");
            }
            if reasons.is_empty() {
                return "AI-like speech patterns detected".to_string();
            }
        }
    }

    reasons.join(" and ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(pitch_std: f64, silence_ratio: f64, spectral_flatness: f64) -> FeatureVector {
        FeatureVector {
            zero_crossing_rate: 0.05,
            spectral_flatness,
            pitch_std,
            silence_ratio,
            duration: 5.0,
        }
    }

    #[test]
    fn test_human_all_predicates() {
        let explanation = explain(Classification::Human, &features(40.0, 0.2, 0.05));
        assert_eq!(
            explanation,
            "Natural pitch variability and Human breathing patterns and Complex spectral characteristics"
        );
    }

    #[test]
    fn test_human_single_predicate() {
        let explanation = explain(Classification::Human, &features(40.0, 0.05, 0.01));
        assert_eq!(explanation, "Natural pitch variability");
    }

    #[test]
    fn test_human_fallback() {
        // No human predicate holds even though the label is HUMAN
        let explanation = explain(Classification::Human, &features(10.0, 0.05, 0.01));
        assert_eq!(explanation, "Natural speech patterns detected");
    }

    #[test]
    fn test_ai_all_predicates() {
        let explanation = explain(Classification::AiGenerated, &features(5.0, 0.02, 0.005));
        assert_eq!(
            explanation,
            "Monotonic pitch and No natural pauses and Overly clean audio"
        );
    }

    #[test]
    fn test_ai_fallback() {
        let explanation = explain(Classification::AiGenerated, &features(30.0, 0.3, 0.05));
        assert_eq!(explanation, "AI-like speech patterns detected");
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        // Values exactly at the thresholds trigger neither side's predicate
        let explanation = explain(Classification::Human, &features(20.0, 0.1, 0.02));
        assert_eq!(explanation, "Natural speech patterns detected");

        let explanation = explain(Classification::AiGenerated, &features(15.0, 0.08, 0.015));
        assert_eq!(explanation, "AI-like speech patterns detected");
    }
}
