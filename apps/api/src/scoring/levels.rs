//! Level Mapper — the three ordinal scales and both mapping policies.
//!
//! Each dimension (academic, language, professional) is one enum defined once.
//! Labels are matched case-insensitively; some levels accept aliases
//! ("júnior" / "junior", "pós graduação" / "pós-graduação").
//!
//! Policies:
//! - exact selection (`from_label`): one closed-set label, unknown → `LevelError`.
//! - best match in free text (`best_match_in_text`): highest value among all
//!   labels found as substrings of the text, 0.0 when none is found.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LevelError {
    #[error("unknown {dimension} level '{label}'")]
    UnknownLabel {
        dimension: &'static str,
        label: String,
    },
}

/// A fixed, totally ordered label → value table.
pub trait OrdinalScale: Copy + Sized + 'static {
    /// Human-readable name of the dimension, used in errors and listings.
    const DIMENSION: &'static str;

    /// Every accepted label (canonical and alias), lower-case.
    const LABELS: &'static [(&'static str, Self)];

    fn value(self) -> f64;

    /// Canonical display label.
    fn label(self) -> &'static str;

    /// Exact-selection policy.
    fn from_label(label: &str) -> Result<Self, LevelError> {
        let wanted = fold_label(label);
        Self::LABELS
            .iter()
            .find(|(candidate, _)| *candidate == wanted)
            .map(|(_, level)| *level)
            .ok_or_else(|| LevelError::UnknownLabel {
                dimension: Self::DIMENSION,
                label: label.trim().to_string(),
            })
    }

    /// Best-match-in-free-text policy.
    fn best_match_in_text(text: &str) -> f64 {
        let haystack = text.to_lowercase();
        Self::LABELS
            .iter()
            .filter(|(label, _)| haystack.contains(label))
            .map(|(_, level)| level.value())
            .fold(0.0, f64::max)
    }
}

fn fold_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ────────────────────────────────────────────────────────────────────────────
// Academic
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicLevel {
    EnsinoFundamental,
    EnsinoMedio,
    EnsinoTecnico,
    EnsinoSuperior,
    PosGraduacao,
    Mestrado,
    Doutorado,
}

impl OrdinalScale for AcademicLevel {
    const DIMENSION: &'static str = "academic";
    const LABELS: &'static [(&'static str, Self)] = &[
        ("ensino fundamental", Self::EnsinoFundamental),
        ("ensino médio", Self::EnsinoMedio),
        ("ensino técnico", Self::EnsinoTecnico),
        ("ensino superior", Self::EnsinoSuperior),
        ("pós-graduação", Self::PosGraduacao),
        ("pós graduação", Self::PosGraduacao),
        ("mestrado", Self::Mestrado),
        ("doutorado", Self::Doutorado),
    ];

    fn value(self) -> f64 {
        match self {
            Self::EnsinoFundamental => 0.5,
            Self::EnsinoMedio => 1.0,
            Self::EnsinoTecnico => 1.5,
            Self::EnsinoSuperior => 2.0,
            Self::PosGraduacao => 3.0,
            Self::Mestrado => 4.0,
            Self::Doutorado => 5.0,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::EnsinoFundamental => "ensino fundamental",
            Self::EnsinoMedio => "ensino médio",
            Self::EnsinoTecnico => "ensino técnico",
            Self::EnsinoSuperior => "ensino superior",
            Self::PosGraduacao => "pós-graduação",
            Self::Mestrado => "mestrado",
            Self::Doutorado => "doutorado",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Language proficiency
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageLevel {
    #[default]
    Nenhum,
    Basico,
    Intermediario,
    Avancado,
    Fluente,
}

impl OrdinalScale for LanguageLevel {
    const DIMENSION: &'static str = "language";
    const LABELS: &'static [(&'static str, Self)] = &[
        ("nenhum", Self::Nenhum),
        ("básico", Self::Basico),
        ("intermediário", Self::Intermediario),
        ("avançado", Self::Avancado),
        ("fluente", Self::Fluente),
    ];

    fn value(self) -> f64 {
        match self {
            Self::Nenhum => 0.0,
            Self::Basico => 1.0,
            Self::Intermediario => 2.0,
            Self::Avancado => 3.0,
            Self::Fluente => 4.0,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Nenhum => "nenhum",
            Self::Basico => "básico",
            Self::Intermediario => "intermediário",
            Self::Avancado => "avançado",
            Self::Fluente => "fluente",
        }
    }
}

/// The two languages checked for adherence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    /// Words that mark a résumé line as talking about this language.
    fn markers(self) -> &'static [&'static str] {
        match self {
            Language::English => &["inglês", "ingles", "english"],
            Language::Spanish => &["espanhol", "spanish", "español"],
        }
    }
}

/// Best-match policy restricted to clauses that mention `language`.
///
/// A résumé usually lists several languages, often on one line
/// ("Idiomas: Inglês fluente, Espanhol básico"), so each line is cut into
/// clauses first. Never mentioned → 0.0.
pub fn language_level_in_text(text: &str, language: Language) -> f64 {
    let lowered = text.to_lowercase();
    lowered
        .lines()
        .flat_map(clauses)
        .filter(|clause| language.markers().iter().any(|m| clause.contains(m)))
        .map(LanguageLevel::best_match_in_text)
        .fold(0.0, f64::max)
}

/// Splits a lower-cased line on list separators and conjunctions.
fn clauses(line: &str) -> impl Iterator<Item = &str> {
    line.split([',', ';', '|', '/'])
        .flat_map(|piece| piece.split(" e "))
        .flat_map(|piece| piece.split(" and "))
        .flat_map(|piece| piece.split(" y "))
}

// ────────────────────────────────────────────────────────────────────────────
// Professional / seniority
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfessionalLevel {
    Aprendiz,
    Trainee,
    Auxiliar,
    Assistente,
    Tecnico,
    Junior,
    Analista,
    Pleno,
    Supervisor,
    Lider,
    Senior,
    Especialista,
    Coordenador,
    Gerente,
}

impl OrdinalScale for ProfessionalLevel {
    const DIMENSION: &'static str = "professional";
    const LABELS: &'static [(&'static str, Self)] = &[
        ("aprendiz", Self::Aprendiz),
        ("trainee", Self::Trainee),
        ("auxiliar", Self::Auxiliar),
        ("assistente", Self::Assistente),
        ("técnico", Self::Tecnico),
        ("técnico de nível médio", Self::Tecnico),
        ("júnior", Self::Junior),
        ("junior", Self::Junior),
        ("analista", Self::Analista),
        ("pleno", Self::Pleno),
        ("supervisor", Self::Supervisor),
        ("líder", Self::Lider),
        ("sênior", Self::Senior),
        ("senior", Self::Senior),
        ("especialista", Self::Especialista),
        ("coordenador", Self::Coordenador),
        ("gerente", Self::Gerente),
    ];

    fn value(self) -> f64 {
        match self {
            Self::Aprendiz => 1.0,
            Self::Trainee => 2.0,
            Self::Auxiliar => 3.0,
            Self::Assistente => 4.0,
            Self::Tecnico => 5.0,
            Self::Junior => 6.0,
            Self::Analista => 6.0,
            Self::Pleno => 7.0,
            Self::Supervisor => 7.0,
            Self::Lider => 7.5,
            Self::Senior => 8.0,
            Self::Especialista => 9.0,
            Self::Coordenador => 9.0,
            Self::Gerente => 10.0,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Aprendiz => "aprendiz",
            Self::Trainee => "trainee",
            Self::Auxiliar => "auxiliar",
            Self::Assistente => "assistente",
            Self::Tecnico => "técnico",
            Self::Junior => "júnior",
            Self::Analista => "analista",
            Self::Pleno => "pleno",
            Self::Supervisor => "supervisor",
            Self::Lider => "líder",
            Self::Senior => "sênior",
            Self::Especialista => "especialista",
            Self::Coordenador => "coordenador",
            Self::Gerente => "gerente",
        }
    }
}

impl ProfessionalLevel {
    /// Seniority scaled to [0.1, 1.0] for the classifier feature vector.
    pub fn normalized(self) -> f64 {
        self.value() / 10.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Listing (for the form dropdowns)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ScaleEntry {
    pub label: &'static str,
    pub value: f64,
}

/// Canonical labels of a scale in ascending order, aliases omitted.
pub fn scale_entries<S: OrdinalScale + PartialEq>() -> Vec<ScaleEntry> {
    let mut seen: Vec<S> = Vec::new();
    let mut entries = Vec::new();
    for (_, level) in S::LABELS {
        if seen.contains(level) {
            continue;
        }
        seen.push(*level);
        entries.push(ScaleEntry {
            label: level.label(),
            value: level.value(),
        });
    }
    entries.sort_by(|a, b| a.value.total_cmp(&b.value));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_selection_is_case_insensitive() {
        assert_eq!(
            AcademicLevel::from_label("  Ensino Superior ").unwrap(),
            AcademicLevel::EnsinoSuperior
        );
        assert_eq!(
            LanguageLevel::from_label("FLUENTE").unwrap(),
            LanguageLevel::Fluente
        );
    }

    #[test]
    fn test_exact_selection_accepts_aliases() {
        assert_eq!(
            ProfessionalLevel::from_label("Junior").unwrap(),
            ProfessionalLevel::Junior
        );
        assert_eq!(
            ProfessionalLevel::from_label("Técnico de Nível Médio").unwrap(),
            ProfessionalLevel::Tecnico
        );
        assert_eq!(
            AcademicLevel::from_label("Pós Graduação").unwrap(),
            AcademicLevel::PosGraduacao
        );
    }

    #[test]
    fn test_exact_selection_unknown_label_fails() {
        let err = AcademicLevel::from_label("bacharelado").unwrap_err();
        assert_eq!(
            err,
            LevelError::UnknownLabel {
                dimension: "academic",
                label: "bacharelado".to_string()
            }
        );
    }

    #[test]
    fn test_exact_selection_empty_label_fails() {
        assert!(LanguageLevel::from_label("").is_err());
    }

    #[test]
    fn test_best_match_returns_highest_level() {
        let cv = "Ensino médio completo. Graduação em Ensino Superior. Mestrado em curso.";
        assert_eq!(AcademicLevel::best_match_in_text(cv), 4.0);
    }

    #[test]
    fn test_best_match_pos_graduacao_maps_to_three() {
        let cv = "Formação: PÓS-GRADUAÇÃO em Ciência de Dados";
        assert_eq!(AcademicLevel::best_match_in_text(cv), 3.0);
    }

    #[test]
    fn test_best_match_no_label_is_zero() {
        assert_eq!(AcademicLevel::best_match_in_text("sem formação listada"), 0.0);
        assert_eq!(ProfessionalLevel::best_match_in_text(""), 0.0);
    }

    #[test]
    fn test_language_level_scoped_to_language_lines() {
        let cv = "Idiomas:\nInglês fluente\nEspanhol básico\n";
        assert_eq!(language_level_in_text(cv, Language::English), 4.0);
        assert_eq!(language_level_in_text(cv, Language::Spanish), 1.0);
    }

    #[test]
    fn test_language_levels_on_one_line() {
        let cv = "Idiomas: Inglês fluente, Espanhol básico";
        assert_eq!(language_level_in_text(cv, Language::English), 4.0);
        assert_eq!(language_level_in_text(cv, Language::Spanish), 1.0);

        let cv = "Inglês avançado e espanhol intermediário | Francês básico";
        assert_eq!(language_level_in_text(cv, Language::English), 3.0);
        assert_eq!(language_level_in_text(cv, Language::Spanish), 2.0);
    }

    #[test]
    fn test_language_never_mentioned_is_zero() {
        let cv = "Inglês avançado";
        assert_eq!(language_level_in_text(cv, Language::Spanish), 0.0);
    }

    #[test]
    fn test_scales_are_ordered() {
        assert!(AcademicLevel::EnsinoMedio.value() < AcademicLevel::EnsinoTecnico.value());
        assert!(LanguageLevel::Avancado.value() < LanguageLevel::Fluente.value());
        assert!(ProfessionalLevel::Pleno.value() < ProfessionalLevel::Lider.value());
        assert_eq!(ProfessionalLevel::Gerente.normalized(), 1.0);
    }

    #[test]
    fn test_canonical_labels_round_trip() {
        for (_, level) in AcademicLevel::LABELS {
            assert_eq!(AcademicLevel::from_label(level.label()).unwrap(), *level);
        }
        for (_, level) in ProfessionalLevel::LABELS {
            assert_eq!(ProfessionalLevel::from_label(level.label()).unwrap(), *level);
        }
    }

    #[test]
    fn test_scale_entries_skip_aliases() {
        let entries = scale_entries::<AcademicLevel>();
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[0].label, "ensino fundamental");
        assert_eq!(entries.last().unwrap().label, "doutorado");
        assert_eq!(scale_entries::<ProfessionalLevel>().len(), 14);
    }
}
