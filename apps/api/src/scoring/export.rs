//! CSV export of a ranking run, in the format spreadsheet users expect:
//! `;` separator, decimal comma, UTF-8 with BOM.

use serde::Deserialize;
use thiserror::Error;

use crate::scoring::adherence::LevelValues;
use crate::scoring::models::{RankingRun, MISSING_PREVIEW_LEN};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const EMPTY_TERMS: &str = "Nenhum";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV flush failed: {0}")]
    Flush(String),
}

/// Which table of the run to export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportTable {
    #[default]
    Summary,
    Details,
}

impl ExportTable {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportTable::Summary => "resumo_candidatos.csv",
            ExportTable::Details => "detalhes_candidatos.csv",
        }
    }
}

/// Renders `table` of `run` as CSV bytes, in ranking order.
pub fn export_csv(run: &RankingRun, table: ExportTable) -> Result<Vec<u8>, ExportError> {
    let mut buffer = UTF8_BOM.to_vec();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(&mut buffer);

    match table {
        ExportTable::Summary => write_summary(&mut writer, run)?,
        ExportTable::Details => write_details(&mut writer, run)?,
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(buffer)
}

fn write_summary<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    run: &RankingRun,
) -> Result<(), csv::Error> {
    writer.write_record([
        "ID",
        "Nome",
        "Score Combinado",
        "Status",
        "Probabilidade",
        "Match",
        "Termos",
        "Similaridade",
        "Nível Acadêmico",
        "Inglês",
        "Espanhol",
    ])?;

    for result in &run.results {
        let levels = run.detail(result.id).map(|d| d.candidate_levels);
        let level = |pick: fn(&LevelValues) -> f64| {
            levels.as_ref().map(pick).map(decimal).unwrap_or_default()
        };
        writer.write_record([
            result.id.to_string(),
            result.name.clone(),
            decimal(result.score_combined),
            result.status.display_label().to_string(),
            decimal(result.probability),
            decimal(result.match_percent),
            format!("{}/{}", result.matched_term_count, result.total_terms),
            decimal(result.similarity),
            level(|l| l.academic),
            level(|l| l.english),
            level(|l| l.spanish),
        ])?;
    }
    Ok(())
}

fn write_details<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    run: &RankingRun,
) -> Result<(), csv::Error> {
    writer.write_record([
        "ID",
        "Nome",
        "TermosEncontrados",
        "TermosFaltantes",
        "TextoProcessado",
        "Probabilidade",
        "Match",
        "Similaridade",
        "Aderência Acadêmica",
        "Aderência Inglês",
        "Aderência Espanhol",
    ])?;

    for detail in &run.details {
        writer.write_record([
            detail.id.to_string(),
            detail.name.clone(),
            join_terms(detail.matched_terms.iter().map(String::as_str)),
            join_terms(detail.missing_preview(MISSING_PREVIEW_LEN).into_iter()),
            detail.processed_text_preview.clone(),
            decimal(detail.probability),
            decimal(detail.match_percent),
            decimal(detail.similarity),
            decimal(detail.adherence.academic),
            decimal(detail.adherence.english),
            decimal(detail.adherence.spanish),
        ])?;
    }
    Ok(())
}

fn join_terms<'a>(terms: impl Iterator<Item = &'a str>) -> String {
    let joined = terms.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        EMPTY_TERMS.to_string()
    } else {
        joined
    }
}

/// Four decimals with a comma separator: 0.7068 → "0,7068".
fn decimal(value: f64) -> String {
    format!("{value:.4}").replace('.', ",")
}
