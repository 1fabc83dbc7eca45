//! Score Composer — weighted Score Combinado and its 3-tier status.

use serde::{Deserialize, Serialize};

use crate::scoring::adherence::AdherenceRule;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub probability: f64,
    pub match_percent: f64,
    pub similarity: f64,
    pub academic_adherence: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            probability: 0.30,
            match_percent: 0.40,
            similarity: 0.20,
            academic_adherence: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.probability + self.match_percent + self.similarity + self.academic_adherence
    }
}

/// Score Combinado: 0.3*probability + 0.4*match + 0.2*similarity + 0.1*academic.
pub fn compose(
    probability: f64,
    match_percent: f64,
    similarity: f64,
    academic_adherence: f64,
    weights: &ScoreWeights,
) -> f64 {
    (weights.probability * probability
        + weights.match_percent * match_percent
        + weights.similarity * similarity
        + weights.academic_adherence * academic_adherence)
        .clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Recommended,
    Potential,
    LowFit,
}

impl CandidateStatus {
    /// Label shown to recruiters and written to exports.
    pub fn display_label(self) -> &'static str {
        match self {
            CandidateStatus::Recommended => "Recomendado",
            CandidateStatus::Potential => "Potencial",
            CandidateStatus::LowFit => "Baixa Aderência",
        }
    }
}

pub const RECOMMENDED_THRESHOLD: f64 = 0.60;
pub const DEFAULT_POTENTIAL_THRESHOLD: f64 = 0.40;

/// Product decisions fixed for a whole run: adherence rule and status tiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub adherence_rule: AdherenceRule,
    pub recommended_threshold: f64,
    pub potential_threshold: f64,
    pub weights: ScoreWeights,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            adherence_rule: AdherenceRule::Graded,
            recommended_threshold: RECOMMENDED_THRESHOLD,
            potential_threshold: DEFAULT_POTENTIAL_THRESHOLD,
            weights: ScoreWeights::default(),
        }
    }
}

impl ScoringPolicy {
    pub fn status(&self, score: f64) -> CandidateStatus {
        if score >= self.recommended_threshold {
            CandidateStatus::Recommended
        } else if score >= self.potential_threshold {
            CandidateStatus::Potential
        } else {
            CandidateStatus::LowFit
        }
    }
}
