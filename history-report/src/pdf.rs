//! A4 rendering with `printpdf`'s built-in Helvetica.

use std::io::BufWriter;

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use tracing::debug;

use crate::layout::{layout_report, LaidOutPage, Line, PageGeometry};
use crate::model::Report;
use crate::ReportError;

const LAYER: &str = "Layer 1";
const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 12.0;
const TEXT_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 8.0;
const FOOTER_SIZE: f32 = 8.0;
const MM_PER_POINT: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH_EM: f32 = 0.5;
const CELL_PADDING: f32 = 1.5;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

pub fn render_pdf(report: &Report) -> Result<Vec<u8>, ReportError> {
    render_pdf_with(report, &PageGeometry::a4())
}

pub fn render_pdf_with(report: &Report, geometry: &PageGeometry) -> Result<Vec<u8>, ReportError> {
    let pages = layout_report(report, geometry);
    let (doc, first_page, first_layer) =
        PdfDocument::new(&report.title, Mm(geometry.width), Mm(geometry.height), LAYER);
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Pdf(format!("font error: {e}")))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Pdf(format!("font error: {e}")))?,
    };

    for page in &pages {
        let layer = if page.number == 1 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (index, layer) = doc.add_page(Mm(geometry.width), Mm(geometry.height), LAYER);
            doc.get_page(index).get_layer(layer)
        };
        draw_page(&layer, page, geometry, &fonts);
    }
    debug!(pages = pages.len(), tables = report.tables.len(), "report rendered");

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Pdf(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ReportError::Pdf(format!("PDF buffer error: {e}")))
}

fn draw_page(
    layer: &PdfLayerReference,
    page: &LaidOutPage,
    geometry: &PageGeometry,
    fonts: &Fonts,
) {
    let left = geometry.margin;
    for placed in &page.lines {
        // Baseline sits a little above the bottom of the line box.
        let top = geometry.height - geometry.margin - placed.top;
        let baseline = top - placed.line.height(geometry) * 0.8;
        let y = Mm(baseline);
        match &placed.line {
            Line::Title(text) => {
                layer.use_text(text.as_str(), TITLE_SIZE, Mm(left), y, &fonts.bold)
            }
            Line::Heading(text) => {
                layer.use_text(text.as_str(), HEADING_SIZE, Mm(left), y, &fonts.bold)
            }
            Line::Text(text) => {
                layer.use_text(text.as_str(), TEXT_SIZE, Mm(left), y, &fonts.regular)
            }
            Line::TableHeader { cells, widths } => {
                draw_cells(layer, cells, widths, left, baseline, &fonts.bold)
            }
            Line::TableRow { cells, widths } => {
                draw_cells(layer, cells, widths, left, baseline, &fonts.regular)
            }
        }
    }

    let footer_x = geometry.width / 2.0 - fit_width(&page.footer, FOOTER_SIZE) / 2.0;
    layer.use_text(
        page.footer.as_str(),
        FOOTER_SIZE,
        Mm(footer_x),
        Mm(geometry.margin),
        &fonts.regular,
    );
}

fn draw_cells(
    layer: &PdfLayerReference,
    cells: &[String],
    widths: &[f32],
    left: f32,
    baseline: f32,
    font: &IndirectFontRef,
) {
    let mut x = left;
    for (text, width) in cells.iter().zip(widths) {
        let fitted = fit_text(text, width - CELL_PADDING, TABLE_SIZE);
        if !fitted.is_empty() {
            layer.use_text(fitted, TABLE_SIZE, Mm(x), Mm(baseline), font);
        }
        x += width;
    }
}

fn fit_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * MM_PER_POINT * GLYPH_WIDTH_EM
}

/// Cut `text` so it fits `width` millimetres at `size` points.
fn fit_text(text: &str, width: f32, size: f32) -> String {
    let glyph = size * MM_PER_POINT * GLYPH_WIDTH_EM;
    let max_chars = (width.max(0.0) / glyph).floor() as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return text.chars().take(max_chars).collect();
    }
    let head: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", head.trim_end())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use history_core::HistoryAggregate;

    use super::*;
    use crate::model::{build_report, ReportSubject};

    #[test]
    fn empty_history_still_renders_a_pdf() {
        let report = build_report(
            &HistoryAggregate::default(),
            &ReportSubject::default(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        );
        let bytes = render_pdf(&report).unwrap();
        assert_eq!(&bytes[0..4], b"%PDF");
    }

    #[test]
    fn long_cells_are_cut_to_column_width() {
        let fitted = fit_text("Community acquired pneumonia with effusion", 20.0, TABLE_SIZE);
        assert!(fitted.ends_with("..."));
        assert!(fit_width(&fitted, TABLE_SIZE) <= 20.0);
        assert_eq!(fit_text("CBC", 20.0, TABLE_SIZE), "CBC");
    }
}
