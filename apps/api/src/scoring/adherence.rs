//! Adherence Evaluator — compares a candidate's level with the job's required level.

use serde::{Deserialize, Serialize};

/// Adherence rule, chosen once per pipeline and applied to every dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceRule {
    /// 1.0 when at or above the requirement, 0.5 within one level below, else 0.0.
    #[default]
    Graded,
    /// 1.0 when at or above the requirement, else 0.0.
    Binary,
}

impl std::str::FromStr for AdherenceRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graded" => Ok(AdherenceRule::Graded),
            "binary" => Ok(AdherenceRule::Binary),
            other => Err(format!("unknown adherence rule '{other}' (expected graded|binary)")),
        }
    }
}

/// Adherence of `candidate_level` to `required_level`. Always 0.0, 0.5 or 1.0.
pub fn adherence(candidate_level: f64, required_level: f64, rule: AdherenceRule) -> f64 {
    if candidate_level >= required_level {
        return 1.0;
    }
    match rule {
        AdherenceRule::Graded if candidate_level >= required_level - 1.0 => 0.5,
        _ => 0.0,
    }
}

/// Per-dimension adherence for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdherenceBreakdown {
    pub academic: f64,
    pub english: f64,
    pub spanish: f64,
}

impl AdherenceBreakdown {
    pub fn evaluate(candidate: &LevelValues, required: &LevelValues, rule: AdherenceRule) -> Self {
        Self {
            academic: adherence(candidate.academic, required.academic, rule),
            english: adherence(candidate.english, required.english, rule),
            spanish: adherence(candidate.spanish, required.spanish, rule),
        }
    }
}

/// Numeric levels on the three checked dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelValues {
    pub academic: f64,
    pub english: f64,
    pub spanish: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graded_rule_values() {
        let r = AdherenceRule::Graded;
        assert_eq!(adherence(3.0, 2.0, r), 1.0);
        assert_eq!(adherence(2.0, 2.0, r), 1.0);
        assert_eq!(adherence(1.5, 2.0, r), 0.5);
        assert_eq!(adherence(1.0, 2.0, r), 0.5);
        assert_eq!(adherence(0.5, 2.0, r), 0.0);
    }

    #[test]
    fn test_binary_rule_values() {
        let r = AdherenceRule::Binary;
        assert_eq!(adherence(3.0, 2.0, r), 1.0);
        assert_eq!(adherence(1.5, 2.0, r), 0.0);
        assert_eq!(adherence(0.0, 4.0, r), 0.0);
    }

    #[test]
    fn test_zero_requirement_always_met() {
        assert_eq!(adherence(0.0, 0.0, AdherenceRule::Graded), 1.0);
        assert_eq!(adherence(0.0, 0.0, AdherenceRule::Binary), 1.0);
    }

    #[test]
    fn test_adherence_stays_in_discrete_set() {
        let levels = [0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0, 5.0, 7.5, 10.0];
        for rule in [AdherenceRule::Graded, AdherenceRule::Binary] {
            for &c in &levels {
                for &req in &levels {
                    let a = adherence(c, req, rule);
                    assert!(a == 0.0 || a == 0.5 || a == 1.0, "{c} vs {req}: {a}");
                    if rule == AdherenceRule::Binary {
                        assert_ne!(a, 0.5);
                    }
                }
            }
        }
    }

    #[test]
    fn test_post_grad_meets_superior_requirement() {
        // pós-graduação (3) against ensino superior (2)
        assert_eq!(adherence(3.0, 2.0, AdherenceRule::Graded), 1.0);
        assert_eq!(adherence(3.0, 2.0, AdherenceRule::Binary), 1.0);
    }

    #[test]
    fn test_breakdown_applies_rule_uniformly() {
        let candidate = LevelValues {
            academic: 1.0,
            english: 3.0,
            spanish: 0.0,
        };
        let required = LevelValues {
            academic: 2.0,
            english: 4.0,
            spanish: 0.0,
        };
        let graded = AdherenceBreakdown::evaluate(&candidate, &required, AdherenceRule::Graded);
        assert_eq!((graded.academic, graded.english, graded.spanish), (0.5, 0.5, 1.0));
        let binary = AdherenceBreakdown::evaluate(&candidate, &required, AdherenceRule::Binary);
        assert_eq!((binary.academic, binary.english, binary.spanish), (0.0, 0.0, 1.0));
    }

    #[test]
    fn test_rule_from_str() {
        assert_eq!("Graded".parse::<AdherenceRule>().unwrap(), AdherenceRule::Graded);
        assert_eq!(" binary ".parse::<AdherenceRule>().unwrap(), AdherenceRule::Binary);
        assert!("strict".parse::<AdherenceRule>().is_err());
    }
}
