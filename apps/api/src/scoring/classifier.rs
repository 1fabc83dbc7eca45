//! Classifier Adapter — scaler + probabilistic classifier over the 7-feature vector.
//!
//! Feature order is a contract with the trained artifacts:
//! `[match_percent, similarity, matched_term_count, academic_adherence,
//!   english_adherence, spanish_adherence, seniority / 10]`.
//!
//! Both artifacts are opaque to the pipeline: it only calls
//! `FeatureScaler::transform` and `ProbabilisticClassifier::predict_proba`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of features every scaler and classifier must accept.
pub const FEATURE_COUNT: usize = 7;

/// Probability used when scaling or prediction fails for a candidate.
pub const DEFAULT_PROBABILITY: f64 = 0.5;

/// Guards against cyclic trees in a corrupt artifact.
const MAX_TREE_DEPTH: usize = 512;

#[derive(Debug, Error, PartialEq)]
pub enum ClassifierError {
    #[error("{artifact} expects {expected} features, got {actual}")]
    DimensionMismatch {
        artifact: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("tree {tree}: node {node} references missing node {child}")]
    DanglingNode { tree: usize, node: usize, child: usize },

    #[error("tree {tree}: split on feature {feature} out of range")]
    FeatureOutOfRange { tree: usize, feature: usize },

    #[error("tree {tree}: exceeded max depth (cyclic or malformed)")]
    TooDeep { tree: usize },

    #[error("tree {tree}: leaf has no class counts")]
    EmptyLeaf { tree: usize },

    #[error("forest has no trees")]
    EmptyForest,

    #[error("non-finite value produced by {0}")]
    NonFinite(&'static str),
}

// ────────────────────────────────────────────────────────────────────────────
// Feature vector
// ────────────────────────────────────────────────────────────────────────────

/// Fixed-order feature vector, built per candidate and consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub match_percent: f64,
    pub similarity: f64,
    pub matched_term_count: f64,
    pub academic_adherence: f64,
    pub english_adherence: f64,
    pub spanish_adherence: f64,
    pub normalized_seniority: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.match_percent,
            self.similarity,
            self.matched_term_count,
            self.academic_adherence,
            self.english_adherence,
            self.spanish_adherence,
            self.normalized_seniority,
        ]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scaler
// ────────────────────────────────────────────────────────────────────────────

/// Pre-fitted feature scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureScaler {
    /// `x * scale + min` (range scaling).
    MinMax { scale: Vec<f64>, min: Vec<f64> },
    /// `(x - mean) / scale` (standardization).
    Standard { mean: Vec<f64>, scale: Vec<f64> },
}

impl FeatureScaler {
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let (a, b) = match self {
            FeatureScaler::MinMax { scale, min } => (scale.len(), min.len()),
            FeatureScaler::Standard { mean, scale } => (mean.len(), scale.len()),
        };
        for len in [a, b] {
            if len != FEATURE_COUNT {
                return Err(ClassifierError::DimensionMismatch {
                    artifact: "scaler",
                    expected: FEATURE_COUNT,
                    actual: len,
                });
            }
        }
        Ok(())
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        self.validate()?;
        if x.len() != FEATURE_COUNT {
            return Err(ClassifierError::DimensionMismatch {
                artifact: "feature vector",
                expected: FEATURE_COUNT,
                actual: x.len(),
            });
        }
        let out: Vec<f64> = match self {
            FeatureScaler::MinMax { scale, min } => x
                .iter()
                .zip(scale.iter().zip(min))
                .map(|(v, (s, m))| v * s + m)
                .collect(),
            FeatureScaler::Standard { mean, scale } => x
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(v, (m, s))| if *s == 0.0 { v - m } else { (v - m) / s })
                .collect(),
        };
        if out.iter().any(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFinite("scaler"));
        }
        Ok(out)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Classifier
// ────────────────────────────────────────────────────────────────────────────

/// Anything that can estimate P(fit) for a scaled feature vector.
pub trait ProbabilisticClassifier: Send + Sync {
    fn predict_proba(&self, x: &[f64]) -> Result<f64, ClassifierError>;
}

/// One node of a decision tree. Splits send `x[feature] <= threshold` left.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class sample counts (or fractions) at the leaf: `[negative, positive]`.
    Leaf { value: Vec<f64> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, tree: usize) -> Result<(), ClassifierError> {
        if self.nodes.is_empty() {
            return Err(ClassifierError::DanglingNode {
                tree,
                node: 0,
                child: 0,
            });
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(ClassifierError::FeatureOutOfRange {
                            tree,
                            feature: *feature,
                        });
                    }
                    for &child in [left, right] {
                        if child >= self.nodes.len() {
                            return Err(ClassifierError::DanglingNode {
                                tree,
                                node: idx,
                                child,
                            });
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.is_empty() {
                        return Err(ClassifierError::EmptyLeaf { tree });
                    }
                }
            }
        }
        Ok(())
    }

    /// Positive-class fraction at the leaf reached by `x`.
    fn predict(&self, tree: usize, x: &[f64]) -> Result<f64, ClassifierError> {
        let mut idx = 0;
        for _ in 0..MAX_TREE_DEPTH {
            let node = self.nodes.get(idx).ok_or(ClassifierError::DanglingNode {
                tree,
                node: idx,
                child: idx,
            })?;
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = *x
                        .get(*feature)
                        .ok_or(ClassifierError::FeatureOutOfRange {
                            tree,
                            feature: *feature,
                        })?;
                    idx = if v <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    let positive = value.get(1).copied().unwrap_or(0.0);
                    if total <= 0.0 {
                        return Err(ClassifierError::EmptyLeaf { tree });
                    }
                    return Ok(positive / total);
                }
            }
        }
        Err(ClassifierError::TooDeep { tree })
    }
}

/// Pre-trained binary classifier artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitClassifier {
    /// Mean of per-tree leaf probabilities.
    RandomForest {
        n_features: usize,
        trees: Vec<DecisionTree>,
    },
    /// `sigmoid(coef · x + intercept)`.
    Logistic { coef: Vec<f64>, intercept: f64 },
}

impl FitClassifier {
    pub fn validate(&self) -> Result<(), ClassifierError> {
        match self {
            FitClassifier::RandomForest { n_features, trees } => {
                if *n_features != FEATURE_COUNT {
                    return Err(ClassifierError::DimensionMismatch {
                        artifact: "classifier",
                        expected: FEATURE_COUNT,
                        actual: *n_features,
                    });
                }
                if trees.is_empty() {
                    return Err(ClassifierError::EmptyForest);
                }
                trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, tree)| tree.validate(i))
            }
            FitClassifier::Logistic { coef, .. } => {
                if coef.len() != FEATURE_COUNT {
                    return Err(ClassifierError::DimensionMismatch {
                        artifact: "classifier",
                        expected: FEATURE_COUNT,
                        actual: coef.len(),
                    });
                }
                Ok(())
            }
        }
    }
}

impl ProbabilisticClassifier for FitClassifier {
    fn predict_proba(&self, x: &[f64]) -> Result<f64, ClassifierError> {
        let p = match self {
            FitClassifier::RandomForest { trees, .. } => {
                if trees.is_empty() {
                    return Err(ClassifierError::EmptyForest);
                }
                let mut sum = 0.0;
                for (i, tree) in trees.iter().enumerate() {
                    sum += tree.predict(i, x)?;
                }
                sum / trees.len() as f64
            }
            FitClassifier::Logistic { coef, intercept } => {
                if coef.len() != x.len() {
                    return Err(ClassifierError::DimensionMismatch {
                        artifact: "classifier",
                        expected: coef.len(),
                        actual: x.len(),
                    });
                }
                let z: f64 = coef.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + intercept;
                1.0 / (1.0 + (-z).exp())
            }
        };
        if !p.is_finite() {
            return Err(ClassifierError::NonFinite("classifier"));
        }
        Ok(p.clamp(0.0, 1.0))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Adapter
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of `predict_fit`. `degraded` carries the failure when the default
/// probability was substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct FitPrediction {
    pub probability: f64,
    pub degraded: Option<String>,
}

/// Scales the features and queries the classifier. Never fails: any error
/// falls back to `DEFAULT_PROBABILITY` and is reported in `degraded`.
pub fn predict_fit(
    features: &FeatureVector,
    scaler: &FeatureScaler,
    classifier: &dyn ProbabilisticClassifier,
) -> FitPrediction {
    let result = scaler
        .transform(&features.to_array())
        .and_then(|scaled| classifier.predict_proba(&scaled));

    match result {
        Ok(probability) => FitPrediction {
            probability,
            degraded: None,
        },
        Err(e) => FitPrediction {
            probability: DEFAULT_PROBABILITY,
            degraded: Some(e.to_string()),
        },
    }
}
