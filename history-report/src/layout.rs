//! Places report content onto fixed-size pages.
//!
//! Vertical positions are millimetres from the top of the content area.
//! A table that does not fit in what is left of the current page starts on a
//! new one; a table longer than a whole page carries on across pages with its
//! column header repeated.

use crate::model::{Column, Report, ReportTable};

/// Page size and vertical rhythm, all in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Space reserved at the bottom for the page footer.
    pub footer_height: f32,
    pub title_height: f32,
    pub heading_height: f32,
    pub line_height: f32,
    pub section_gap: f32,
}

impl PageGeometry {
    pub const fn a4() -> Self {
        Self {
            width: 210.0,
            height: 297.0,
            margin: 15.0,
            footer_height: 10.0,
            title_height: 10.0,
            heading_height: 8.0,
            line_height: 5.5,
            section_gap: 6.0,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin - self.footer_height
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Title(String),
    Text(String),
    Heading(String),
    /// Column titles; `widths` are in millimetres and sum to the content width.
    TableHeader { cells: Vec<String>, widths: Vec<f32> },
    TableRow { cells: Vec<String>, widths: Vec<f32> },
}

impl Line {
    pub fn height(&self, geometry: &PageGeometry) -> f32 {
        match self {
            Line::Title(_) => geometry.title_height,
            Line::Heading(_) => geometry.heading_height,
            Line::Text(_) | Line::TableHeader { .. } | Line::TableRow { .. } => {
                geometry.line_height
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub top: f32,
    pub line: Line,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutPage {
    /// 1-based.
    pub number: usize,
    pub lines: Vec<Placed>,
    pub footer: String,
}

impl LaidOutPage {
    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|placed| match &placed.line {
            Line::Heading(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn row_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|placed| matches!(placed.line, Line::TableRow { .. }))
            .count()
    }
}

pub fn layout_report(report: &Report, geometry: &PageGeometry) -> Vec<LaidOutPage> {
    let mut pages = Pager::new(geometry);

    pages.place(Line::Title(report.title.clone()));
    for text in report.subject_lines() {
        pages.place(Line::Text(text));
    }
    pages.gap();

    pages.place(Line::Heading("Summary".to_string()));
    for (category, count) in &report.summary {
        pages.place(Line::Text(format!("{}: {count}", category.heading())));
    }

    for table in &report.tables {
        pages.gap();
        place_table(&mut pages, table, geometry);
    }

    pages.finish()
}

fn place_table(pages: &mut Pager<'_>, table: &ReportTable, geometry: &PageGeometry) {
    let widths = column_widths(&table.columns, geometry.content_width());
    let header = Line::TableHeader {
        cells: table.columns.iter().map(|column| column.title.to_string()).collect(),
        widths: widths.clone(),
    };

    let needed = geometry.heading_height + geometry.line_height * (table.rows.len() + 1) as f32;
    if !pages.fits(needed) {
        pages.break_page();
    }

    pages.place(Line::Heading(table.heading.clone()));
    pages.place(header.clone());
    for row in &table.rows {
        if !pages.fits(geometry.line_height) {
            pages.break_page();
            pages.place(header.clone());
        }
        pages.place(Line::TableRow {
            cells: row.clone(),
            widths: widths.clone(),
        });
    }
}

/// Split `total` between columns in proportion to their weights.
pub fn column_widths(columns: &[Column], total: f32) -> Vec<f32> {
    let weight: u32 = columns.iter().map(|column| u32::from(column.weight.max(1))).sum();
    if weight == 0 {
        return Vec::new();
    }
    columns
        .iter()
        .map(|column| total * f32::from(column.weight.max(1)) / weight as f32)
        .collect()
}

struct Pager<'g> {
    geometry: &'g PageGeometry,
    done: Vec<Vec<Placed>>,
    current: Vec<Placed>,
    cursor: f32,
}

impl<'g> Pager<'g> {
    fn new(geometry: &'g PageGeometry) -> Self {
        Self {
            geometry,
            done: Vec::new(),
            current: Vec::new(),
            cursor: 0.0,
        }
    }

    /// Whether `height` more fits below the cursor. An empty page always
    /// accepts content so oversized lines cannot loop forever.
    fn fits(&self, height: f32) -> bool {
        self.current.is_empty() || self.cursor + height <= self.geometry.content_height()
    }

    fn break_page(&mut self) {
        if self.current.is_empty() {
            return;
        }
        self.done.push(std::mem::take(&mut self.current));
        self.cursor = 0.0;
    }

    fn place(&mut self, line: Line) {
        let height = line.height(self.geometry);
        if !self.fits(height) {
            self.break_page();
        }
        self.current.push(Placed {
            top: self.cursor,
            line,
        });
        self.cursor += height;
    }

    fn gap(&mut self) {
        if !self.current.is_empty() {
            self.cursor += self.geometry.section_gap;
        }
    }

    fn finish(mut self) -> Vec<LaidOutPage> {
        if !self.current.is_empty() || self.done.is_empty() {
            self.done.push(self.current);
        }
        let total = self.done.len();
        self.done
            .into_iter()
            .enumerate()
            .map(|(index, lines)| LaidOutPage {
                number: index + 1,
                lines,
                footer: format!("Page {} of {total}", index + 1),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use history_core::Category;

    use super::*;
    use crate::model::{column, ReportSubject, REPORT_TITLE};

    fn report(tables: Vec<ReportTable>) -> Report {
        Report {
            title: REPORT_TITLE.to_string(),
            subject: ReportSubject {
                name: Some("Asha Verma".into()),
                identifier: Some("MRN-1".into()),
            },
            generated_on: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            summary: Category::ALL.iter().map(|c| (*c, 0)).collect(),
            tables,
        }
    }

    fn table(category: Category, rows: usize) -> ReportTable {
        ReportTable {
            category,
            heading: category.heading().to_string(),
            columns: vec![column("Date", 1), column("Value", 3)],
            rows: (0..rows).map(|i| vec![format!("d{i}"), format!("v{i}")]).collect(),
        }
    }

    #[test]
    fn short_report_is_one_page_with_footer() {
        let admissions = report(vec![table(Category::Admission, 2)]);
        let pages = layout_report(&admissions, &PageGeometry::a4());
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].footer, "Page 1 of 1");
        assert_eq!(pages[0].row_count(), 2);
        assert!(pages[0].headings().any(|h| h == "Admissions"));
    }

    #[test]
    fn long_table_repeats_header_and_numbers_every_page() {
        let pages = layout_report(&report(vec![table(Category::Vitals, 120)]), &PageGeometry::a4());
        assert!(pages.len() >= 4);
        assert!(matches!(&pages[1].lines[0].line, Line::Heading(h) if h == "Vital Signs"));

        let total = pages.len();
        for page in &pages {
            assert_eq!(page.footer, format!("Page {} of {total}", page.number));
        }
        for page in &pages[2..] {
            assert!(matches!(page.lines[0].line, Line::TableHeader { .. }));
        }
        let rows: usize = pages.iter().map(LaidOutPage::row_count).sum();
        assert_eq!(rows, 120);
    }

    #[test]
    fn table_that_does_not_fit_starts_on_new_page() {
        let geometry = PageGeometry::a4();
        // Leaves less room on page 1 than the second table needs.
        let filler_rows = ((geometry.content_height() - 120.0) / geometry.line_height) as usize;
        let pages = layout_report(
            &report(vec![table(Category::Admission, filler_rows), table(Category::Lab, 10)]),
            &geometry,
        );

        assert_eq!(pages.len(), 2);
        assert!(pages[0].headings().all(|h| h != "Lab Tests"));
        assert!(matches!(&pages[1].lines[0].line, Line::Heading(h) if h == "Lab Tests"));
        assert_eq!(pages[1].row_count(), 10);
    }

    #[test]
    fn lines_stay_inside_content_area() {
        let geometry = PageGeometry::a4();
        let pages = layout_report(&report(vec![table(Category::Note, 75)]), &geometry);
        for page in &pages {
            for placed in &page.lines {
                assert!(placed.top + placed.line.height(&geometry) <= geometry.content_height());
            }
        }
    }

    #[test]
    fn widths_fill_content_width() {
        let widths = column_widths(&[column("A", 1), column("B", 3)], 180.0);
        assert_eq!(widths, vec![45.0, 135.0]);
    }
}
