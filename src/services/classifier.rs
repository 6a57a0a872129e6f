//! Classifier engine
//!
//! **Purpose:** Map a 5-dimensional feature vector to a classification label
//! and a per-class probability distribution using a trained artifact.
//!
//! The artifact is a JSON-serialized decision forest produced by offline
//! training. The engine only requires that it yields a distribution over
//! exactly {HUMAN, AI_GENERATED}; how it was trained is out of scope here.
//! The loaded model is shared read-only state for the process lifetime and is
//! never mutated by inference.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::models::Classification;
use crate::services::feature_extractor::FeatureVector;

/// Classifier errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// No trained artifact could be loaded (deployment/configuration fault)
    #[error("Classifier model unavailable: {0}")]
    Unavailable(String),

    /// Artifact exists but its contents are not a usable model
    #[error("Invalid classifier artifact: {0}")]
    Invalid(String),
}

/// Node of a decision tree, indexed within its tree's node table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TreeNode {
    /// Binary split: `feature <= threshold` goes left, else right
    Split {
        /// Index into the model-input feature order
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node with per-class weights (normalized on load)
    Leaf { distribution: Vec<f64> },
}

/// Single decision tree; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<TreeNode>,
}

/// Trained decision-forest artifact
///
/// Loaded once at process start and held as shared, read-only state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    /// Class order for every leaf distribution
    classes: Vec<Classification>,
    trees: Vec<Tree>,
}

/// Result of classifying one feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPrediction {
    /// Arg-max of the averaged class distribution
    pub classification: Classification,
    /// Probability mass of the chosen label, rounded to 2 decimal places
    pub confidence: f64,
    /// Full averaged distribution, in model class order
    pub distribution: Vec<(Classification, f64)>,
}

impl TrainedModel {
    /// Load and validate the artifact from disk
    ///
    /// # Errors
    /// * `ModelError::Unavailable` - artifact missing or unreadable
    /// * `ModelError::Invalid` - artifact present but malformed
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ModelError::Unavailable(format!("{}: {}", path.display(), e))
        })?;
        let model = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            trees = model.trees.len(),
            "Classifier artifact loaded"
        );
        Ok(model)
    }

    /// Parse and validate an artifact from its JSON text
    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let mut model: TrainedModel =
            serde_json::from_str(raw).map_err(|e| ModelError::Invalid(e.to_string()))?;
        model.validate_and_normalize()?;
        Ok(model)
    }

    /// Number of trees in the forest
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Classify a feature vector
    ///
    /// **Algorithm:** walk each tree from its root to a leaf, average the leaf
    /// distributions across trees, pick the arg-max class. Deterministic: the
    /// same vector against the same loaded model always yields the same
    /// (label, confidence).
    pub fn classify(&self, features: &FeatureVector) -> ClassPrediction {
        let input = features.to_array();
        let mut averaged = vec![0.0f64; self.classes.len()];

        for tree in &self.trees {
            let leaf = tree.walk(&input);
            for (slot, &p) in averaged.iter_mut().zip(leaf) {
                *slot += p;
            }
        }
        for slot in averaged.iter_mut() {
            *slot /= self.trees.len() as f64;
        }

        // Arg-max; ties resolve to the first class in model order
        let mut best = 0;
        for (i, &p) in averaged.iter().enumerate() {
            if p > averaged[best] {
                best = i;
            }
        }

        let classification = self.classes[best];
        let confidence = (averaged[best] * 100.0).round() / 100.0;
        let distribution = self
            .classes
            .iter()
            .copied()
            .zip(averaged.iter().copied())
            .collect();

        ClassPrediction {
            classification,
            confidence,
            distribution,
        }
    }

    fn validate_and_normalize(&mut self) -> Result<(), ModelError> {
        if self.classes.len() != 2
            || !self.classes.contains(&Classification::Human)
            || !self.classes.contains(&Classification::AiGenerated)
        {
            return Err(ModelError::Invalid(
                "classes must be exactly {HUMAN, AI_GENERATED}".to_string(),
            ));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("artifact contains no trees".to_string()));
        }

        let n_classes = self.classes.len();
        for (tree_idx, tree) in self.trees.iter_mut().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::Invalid(format!("tree {} is empty", tree_idx)));
            }
            let n_nodes = tree.nodes.len();
            for node in tree.nodes.iter_mut() {
                match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= 5 {
                            return Err(ModelError::Invalid(format!(
                                "tree {}: feature index {} out of range",
                                tree_idx, feature
                            )));
                        }
                        if *left >= n_nodes || *right >= n_nodes {
                            return Err(ModelError::Invalid(format!(
                                "tree {}: child index out of range",
                                tree_idx
                            )));
                        }
                    }
                    TreeNode::Leaf { distribution } => {
                        if distribution.len() != n_classes {
                            return Err(ModelError::Invalid(format!(
                                "tree {}: leaf distribution has {} entries, expected {}",
                                tree_idx,
                                distribution.len(),
                                n_classes
                            )));
                        }
                        let total: f64 = distribution.iter().sum();
                        if total <= 0.0 || distribution.iter().any(|p| *p < 0.0 || !p.is_finite()) {
                            return Err(ModelError::Invalid(format!(
                                "tree {}: leaf distribution is not normalizable",
                                tree_idx
                            )));
                        }
                        for p in distribution.iter_mut() {
                            *p /= total;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Tree {
    /// Walk from the root to a leaf distribution
    ///
    /// Node indices were validated at load time; a malformed cycle would still
    /// terminate via the step bound.
    fn walk(&self, input: &[f64; 5]) -> &[f64] {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if input[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { distribution } => return distribution,
            }
        }
        // Cycle fallback: uniform over classes is impossible to construct
        // from a validated artifact, but keep the walk total regardless
        match &self.nodes[idx] {
            TreeNode::Leaf { distribution } => distribution,
            TreeNode::Split { .. } => &[],
        }
    }
}
