//! Similarity Estimator — TF-IDF cosine similarity with a pre-fitted vectorizer.
//!
//! The vectorizer is an external artifact (vocabulary + IDF weights exported
//! from the training pipeline). Tokenization mirrors the exporter's default
//! token pattern: lower-case runs of two or more word characters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum VectorizerError {
    #[error("vocabulary term '{term}' points at column {index}, but idf has {len} entries")]
    IndexOutOfRange {
        term: String,
        index: usize,
        len: usize,
    },

    #[error("invalid ngram_range ({0}, {1})")]
    InvalidNgramRange(usize, usize),

    #[error("idf weight for column {0} is not finite")]
    NonFiniteIdf(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorNorm {
    #[default]
    L2,
    None,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// Pre-fitted TF-IDF vectorizer. Read-only after load; safe to share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub norm: VectorNorm,
    #[serde(default)]
    pub sublinear_tf: bool,
}

/// Sparse vector: column → weight.
pub type SparseVector = HashMap<usize, f64>;

impl TfidfVectorizer {
    /// Consistency checks run once at artifact load.
    pub fn validate(&self) -> Result<(), VectorizerError> {
        let (lo, hi) = self.ngram_range;
        if lo == 0 || lo > hi {
            return Err(VectorizerError::InvalidNgramRange(lo, hi));
        }
        for (term, &index) in &self.vocabulary {
            if index >= self.idf.len() {
                return Err(VectorizerError::IndexOutOfRange {
                    term: term.clone(),
                    index,
                    len: self.idf.len(),
                });
            }
        }
        if let Some(col) = self.idf.iter().position(|w| !w.is_finite()) {
            return Err(VectorizerError::NonFiniteIdf(col));
        }
        Ok(())
    }

    /// Transforms one document into a (normalized) sparse TF-IDF vector.
    pub fn transform(&self, text: &str) -> Result<SparseVector, VectorizerError> {
        let tokens = tokenize(text);
        let mut counts: HashMap<usize, f64> = HashMap::new();

        let (lo, hi) = self.ngram_range;
        for n in lo..=hi {
            if n == 0 || n > tokens.len() {
                continue;
            }
            for window in tokens.windows(n) {
                let gram = window.join(" ");
                if let Some(&col) = self.vocabulary.get(&gram) {
                    *counts.entry(col).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut vector = SparseVector::with_capacity(counts.len());
        for (col, count) in counts {
            let idf = *self.idf.get(col).ok_or_else(|| VectorizerError::IndexOutOfRange {
                term: String::new(),
                index: col,
                len: self.idf.len(),
            })?;
            let tf = if self.sublinear_tf { count.ln() + 1.0 } else { count };
            vector.insert(col, tf * idf);
        }

        if self.norm == VectorNorm::L2 {
            let norm = l2_norm(&vector);
            if norm > 0.0 {
                vector.values_mut().for_each(|w| *w /= norm);
            }
        }
        Ok(vector)
    }
}

/// Lower-cased word-character runs of length ≥ 2.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

fn l2_norm(v: &SparseVector) -> f64 {
    v.values().map(|w| w * w).sum::<f64>().sqrt()
}

/// Cosine similarity between two sparse vectors. Zero vectors give 0.0.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(col, wa)| large.get(col).map(|wb| wa * wb))
        .sum();
    let denom = l2_norm(a) * l2_norm(b);
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Best-effort text similarity in [0, 1]. Never fails: any vectorizer error
/// or degenerate result yields 0.0.
pub fn similarity(text_a: &str, text_b: &str, vectorizer: &TfidfVectorizer) -> f64 {
    let score = vectorizer
        .transform(text_a)
        .and_then(|a| vectorizer.transform(text_b).map(|b| cosine(&a, &b)));

    match score {
        Ok(s) if s.is_finite() => s.clamp(0.0, 1.0),
        Ok(s) => {
            debug!("non-finite similarity {s}; using 0.0");
            0.0
        }
        Err(e) => {
            debug!("similarity failed: {e}; using 0.0");
            0.0
        }
    }
}
