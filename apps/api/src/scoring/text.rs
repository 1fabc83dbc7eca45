//! Text Normalizer and Requirement Extractor.
//!
//! `normalize` canonicalizes free text into a comparable token stream for the
//! similarity estimator. `extract_competencies` turns the comma-separated
//! requirements field into atomic competency terms; multi-word terms are kept
//! whole and matched as phrases against the résumé text, never tokenized.

use std::collections::{BTreeSet, HashSet};

/// Tokens shorter than this (in characters) are dropped by `normalize`.
const MIN_TOKEN_CHARS: usize = 3;

/// Portuguese stopword list (NLTK corpus). Overridable via `stopwords.txt`.
const PORTUGUESE_STOPWORDS: &[&str] = &[
    "a", "à", "ao", "aos", "aquela", "aquelas", "aquele", "aqueles", "aquilo", "as", "às", "até",
    "com", "como", "da", "das", "de", "dela", "delas", "dele", "deles", "depois", "do", "dos",
    "e", "é", "ela", "elas", "ele", "eles", "em", "entre", "era", "eram", "éramos", "essa",
    "essas", "esse", "esses", "esta", "está", "estamos", "estão", "estar", "estas", "estava",
    "estavam", "estávamos", "este", "esteja", "estejam", "estejamos", "estes", "esteve",
    "estive", "estivemos", "estiver", "estivera", "estiveram", "estivéramos", "estiverem",
    "estivermos", "estivesse", "estivessem", "estivéssemos", "estou", "eu", "foi", "fomos",
    "for", "fora", "foram", "fôramos", "forem", "formos", "fosse", "fossem", "fôssemos", "fui",
    "há", "haja", "hajam", "hajamos", "hão", "havemos", "haver", "hei", "houve", "houvemos",
    "houver", "houvera", "houverá", "houveram", "houvéramos", "houverão", "houverei",
    "houverem", "houveremos", "houveria", "houveriam", "houveríamos", "houvermos", "houvesse",
    "houvessem", "houvéssemos", "isso", "isto", "já", "lhe", "lhes", "mais", "mas", "me",
    "mesmo", "meu", "meus", "minha", "minhas", "muito", "na", "não", "nas", "nem", "no", "nos",
    "nós", "nossa", "nossas", "nosso", "nossos", "num", "numa", "o", "os", "ou", "para", "pela",
    "pelas", "pelo", "pelos", "por", "qual", "quando", "que", "quem", "são", "se", "seja",
    "sejam", "sejamos", "sem", "ser", "será", "serão", "serei", "seremos", "seria", "seriam",
    "seríamos", "seu", "seus", "só", "somos", "sou", "sua", "suas", "também", "te", "tem", "tém",
    "temos", "tenha", "tenham", "tenhamos", "tenho", "terá", "terão", "terei", "teremos",
    "teria", "teriam", "teríamos", "teu", "teus", "teve", "tinha", "tinham", "tínhamos", "tive",
    "tivemos", "tiver", "tivera", "tiveram", "tivéramos", "tiverem", "tivermos", "tivesse",
    "tivessem", "tivéssemos", "tu", "tua", "tuas", "um", "uma", "você", "vocês", "vos",
];

/// Stopword set consumed by `normalize`. Loaded once with the artifact bundle.
#[derive(Debug, Clone)]
pub struct Stopwords(HashSet<String>);

impl Stopwords {
    pub fn portuguese() -> Self {
        Self(PORTUGUESE_STOPWORDS.iter().map(|w| w.to_string()).collect())
    }

    /// Parses a one-word-per-line list. Blank lines and `#` comments are skipped.
    pub fn from_lines(contents: &str) -> Self {
        Self(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_lowercase)
                .collect(),
        )
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Stopwords {
    fn default() -> Self {
        Self::portuguese()
    }
}

/// Word-class characters survive normalization; everything else becomes a space.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Canonicalizes raw text for similarity comparison.
///
/// lower-case → non-word chars to spaces → collapse whitespace →
/// drop stopwords and tokens under 3 chars → rejoin with single spaces.
/// Total and deterministic: empty input yields the empty string.
pub fn normalize(text: &str, stopwords: &Stopwords) -> String {
    let lowered = text.to_lowercase();
    let spaced: String = lowered
        .chars()
        .map(|c| if is_word_char(c) { c } else { ' ' })
        .collect();

    spaced
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|token| !stopwords.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lower-cases and collapses whitespace runs, leaving punctuation intact.
/// Used for phrase matching of competency terms against raw résumé text.
pub fn fold_for_matching(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a comma-separated requirements string into competency terms.
///
/// Each piece is trimmed, lower-cased and whitespace-collapsed; empty pieces
/// are dropped. Multi-word terms ("power bi") stay atomic.
pub fn extract_competencies(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(fold_for_matching)
        .filter(|term| !term.is_empty())
        .collect()
}

/// Partitions the competency set into (matched, missing) against a résumé.
///
/// A term matches when it appears verbatim in the lower-cased,
/// whitespace-collapsed raw text. The two sets always partition `competencies`.
pub fn match_competencies(
    competencies: &BTreeSet<String>,
    raw_text: &str,
) -> (BTreeSet<String>, BTreeSet<String>) {
    let haystack = fold_for_matching(raw_text);
    competencies
        .iter()
        .cloned()
        .partition(|term| haystack.contains(term.as_str()))
}

/// Fraction of competency terms found. Zero when there are no competencies.
pub fn match_percent(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (matched as f64 / total as f64).clamp(0.0, 1.0)
}

/// Truncates to `max_chars` characters, appending "..." when anything was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        let sw = Stopwords::portuguese();
        assert_eq!(
            normalize("Experiência com PYTHON, SQL; e Power-BI!", &sw),
            "experiência python sql power"
        );
    }

    #[test]
    fn test_normalize_drops_short_tokens() {
        let sw = Stopwords::from_lines("");
        assert_eq!(normalize("go is ok but rust wins", &sw), "but rust wins");
    }

    #[test]
    fn test_normalize_counts_chars_not_bytes() {
        // "pé" is 2 chars (3 bytes) and must be dropped; "ção" is 3 chars and kept.
        let sw = Stopwords::from_lines("");
        assert_eq!(normalize("pé ção", &sw), "ção");
    }

    #[test]
    fn test_normalize_removes_stopwords() {
        let sw = Stopwords::portuguese();
        assert_eq!(normalize("trabalhei para você também", &sw), "trabalhei");
    }

    #[test]
    fn test_normalize_empty_and_symbols_only() {
        let sw = Stopwords::portuguese();
        assert_eq!(normalize("", &sw), "");
        assert_eq!(normalize("!!! --- ???", &sw), "");
    }

    #[test]
    fn test_normalize_keeps_underscore_and_digits() {
        let sw = Stopwords::portuguese();
        assert_eq!(normalize("snake_case 2024 x", &sw), "snake_case 2024");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let sw = Stopwords::portuguese();
        let text = "Engenheiro de Dados Sênior — Spark, Airflow";
        assert_eq!(normalize(text, &sw), normalize(text, &sw));
    }

    #[test]
    fn test_stopwords_from_lines_skips_comments() {
        let sw = Stopwords::from_lines("# header\nFoo\n\n  bar  \n");
        assert_eq!(sw.len(), 2);
        assert!(sw.contains("foo"));
        assert!(sw.contains("bar"));
    }

    #[test]
    fn test_extract_competencies_basic() {
        let set = extract_competencies("Python, SQL, Power BI");
        assert_eq!(set, terms(&["python", "sql", "power bi"]));
    }

    #[test]
    fn test_extract_competencies_trims_and_dedups() {
        let set = extract_competencies("  Python ,python,, SQL  ,  ,Power   BI");
        assert_eq!(set, terms(&["python", "sql", "power bi"]));
    }

    #[test]
    fn test_extract_competencies_empty_input() {
        assert!(extract_competencies("").is_empty());
        assert!(extract_competencies(" , ,, ").is_empty());
    }

    #[test]
    fn test_extract_competencies_is_idempotent() {
        let inputs = [
            "Python, SQL, Power BI",
            " a ,B,, c d ,C D",
            "Machine Learning,  Deep   Learning, NLP",
        ];
        for raw in inputs {
            let once = extract_competencies(raw);
            let rejoined = once.iter().cloned().collect::<Vec<_>>().join(", ");
            assert_eq!(extract_competencies(&rejoined), once, "input: {raw}");
            for term in &once {
                assert_eq!(term, &term.trim().to_lowercase());
                assert!(!term.is_empty());
            }
        }
    }

    #[test]
    fn test_match_competencies_partitions_set() {
        let comps = extract_competencies("Python, SQL, Power BI");
        let (matched, missing) =
            match_competencies(&comps, "Analista com PYTHON e sql avançado");
        assert_eq!(matched, terms(&["python", "sql"]));
        assert_eq!(missing, terms(&["power bi"]));
        assert!(matched.is_disjoint(&missing));
        let union: BTreeSet<String> = matched.union(&missing).cloned().collect();
        assert_eq!(union, comps);
    }

    #[test]
    fn test_match_competencies_phrase_across_line_break() {
        let comps = extract_competencies("Power BI");
        let (matched, _) = match_competencies(&comps, "Dashboards em Power\nBI");
        assert_eq!(matched, terms(&["power bi"]));
    }

    #[test]
    fn test_match_percent_bounds() {
        assert_eq!(match_percent(0, 0), 0.0);
        assert!((match_percent(2, 3) - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(match_percent(3, 3), 1.0);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("ação", 2), "aç...");
        assert_eq!(preview("curto", 10), "curto");
        assert_eq!(preview("exato", 5), "exato");
    }
}
