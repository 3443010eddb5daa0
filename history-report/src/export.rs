use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use history_core::HistoryAggregate;
use tracing::info;

use crate::model::{build_report, ReportSubject};
use crate::pdf::render_pdf;
use crate::ReportError;

const FALLBACK_NAME: &str = "Patient";

/// `Medical_History_{Name}_{YYYY-MM-DD}.pdf`, with the name reduced to
/// filesystem-safe characters.
pub fn report_filename(name: Option<&str>, date: NaiveDate) -> String {
    let safe: String = name
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let safe = if safe.is_empty() { FALLBACK_NAME } else { safe.as_str() };
    format!("Medical_History_{safe}_{}.pdf", date.format("%Y-%m-%d"))
}

/// Write the PDF into `dir`, creating the directory when missing.
pub fn save_report(bytes: &[u8], dir: &Path, filename: &str) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(filename);
    std::fs::write(&path, bytes).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Build, render and save the report for `aggregate`.
pub fn export_report(
    aggregate: &HistoryAggregate,
    subject: &ReportSubject,
    generated_on: NaiveDate,
    dir: &Path,
) -> Result<PathBuf, ReportError> {
    let report = build_report(aggregate, subject, generated_on);
    let bytes = render_pdf(&report)?;
    let filename = report_filename(subject.name.as_deref(), generated_on);
    let path = save_report(&bytes, dir, &filename)?;
    info!(
        path = %path.display(),
        bytes = bytes.len(),
        tables = report.tables.len(),
        "history report exported"
    );
    Ok(path)
}
