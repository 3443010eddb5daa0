//! Printable medical history: report model, page layout and PDF export.

use std::path::PathBuf;

pub mod export;
pub mod layout;
pub mod model;
pub mod pdf;

pub use export::{export_report, report_filename, save_report};
pub use layout::{layout_report, LaidOutPage, Line, PageGeometry};
pub use model::{build_report, Column, Report, ReportSubject, ReportTable};
pub use pdf::{render_pdf, render_pdf_with};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("could not write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
