//! Report content, independent of page geometry.

use chrono::{DateTime, NaiveDate, Utc};

use history_core::timeline::{format_reading, truncate_chars};
use history_core::{Category, HistoryAggregate, MedicationItem};

pub const REPORT_TITLE: &str = "Medical History Report";
/// Placeholder for a cell with no value.
pub const EMPTY_CELL: &str = "-";
const NOTE_CELL_CHARS: usize = 120;

/// Who the report is about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSubject {
    pub name: Option<String>,
    /// MRN or other hospital identifier.
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    /// Share of the table width relative to the other columns.
    pub weight: u16,
}

pub(crate) const fn column(title: &'static str, weight: u16) -> Column {
    Column { title, weight }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub category: Category,
    pub heading: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub subject: ReportSubject,
    pub generated_on: NaiveDate,
    /// Record count per category, all eight in report order.
    pub summary: Vec<(Category, usize)>,
    /// Non-empty categories only, in report order.
    pub tables: Vec<ReportTable>,
}

impl Report {
    pub fn table(&self, category: Category) -> Option<&ReportTable> {
        self.tables.iter().find(|table| table.category == category)
    }

    /// Lines of the title block below the title itself.
    pub fn subject_lines(&self) -> Vec<String> {
        vec![
            format!("Patient: {}", self.subject.name.as_deref().unwrap_or(EMPTY_CELL)),
            format!("MRN: {}", self.subject.identifier.as_deref().unwrap_or(EMPTY_CELL)),
            format!("Generated: {}", self.generated_on.format("%Y-%m-%d")),
        ]
    }
}

/// Assemble the full report for everything loaded, regardless of any
/// timeline filter.
pub fn build_report(
    aggregate: &HistoryAggregate,
    subject: &ReportSubject,
    generated_on: NaiveDate,
) -> Report {
    let summary = Category::ALL
        .iter()
        .map(|category| (*category, aggregate.count(*category)))
        .collect();

    let tables = Category::ALL
        .iter()
        .filter(|category| aggregate.count(**category) > 0)
        .map(|category| ReportTable {
            category: *category,
            heading: category.heading().to_string(),
            columns: columns(*category).to_vec(),
            rows: rows(aggregate, *category),
        })
        .collect();

    Report {
        title: REPORT_TITLE.to_string(),
        subject: subject.clone(),
        generated_on,
        summary,
        tables,
    }
}

const ADMISSION_COLUMNS: &[Column] = &[
    column("Admitted", 3),
    column("Discharged", 3),
    column("Ward", 3),
    column("Room", 2),
    column("Reason", 5),
    column("Status", 2),
];
const VISIT_COLUMNS: &[Column] = &[
    column("Date", 3),
    column("Department", 3),
    column("Doctor", 3),
    column("Complaint", 5),
    column("Outcome", 4),
];
const VITALS_COLUMNS: &[Column] = &[
    column("Recorded", 4),
    column("BP", 2),
    column("HR", 1),
    column("Temp", 1),
    column("SpO2", 1),
    column("Weight", 2),
    column("RR", 1),
];
const LAB_COLUMNS: &[Column] = &[
    column("Ordered", 3),
    column("Test", 4),
    column("Result", 3),
    column("Range", 3),
    column("Flag", 2),
    column("Status", 2),
];
const PRESCRIPTION_COLUMNS: &[Column] = &[
    column("Date", 3),
    column("Prescriber", 3),
    column("Medications", 9),
    column("Status", 2),
];
const PROCEDURE_COLUMNS: &[Column] = &[
    column("Date", 3),
    column("Procedure", 4),
    column("Surgeon", 3),
    column("Diagnosis", 4),
    column("Status", 2),
];
const DOCUMENT_COLUMNS: &[Column] = &[column("Uploaded", 3), column("Name", 6), column("Type", 3)];
const NOTE_COLUMNS: &[Column] = &[
    column("Date", 3),
    column("Type", 2),
    column("Author", 3),
    column("Note", 9),
];

fn columns(category: Category) -> &'static [Column] {
    match category {
        Category::Admission => ADMISSION_COLUMNS,
        Category::Visit => VISIT_COLUMNS,
        Category::Vitals => VITALS_COLUMNS,
        Category::Lab => LAB_COLUMNS,
        Category::Prescription => PRESCRIPTION_COLUMNS,
        Category::Procedure => PROCEDURE_COLUMNS,
        Category::Document => DOCUMENT_COLUMNS,
        Category::Note => NOTE_COLUMNS,
    }
}

fn rows(aggregate: &HistoryAggregate, category: Category) -> Vec<Vec<String>> {
    match category {
        Category::Admission => aggregate
            .admissions
            .iter()
            .map(|a| {
                vec![
                    date(a.admission_date),
                    a.discharge_date.map(date).unwrap_or_else(|| EMPTY_CELL.to_string()),
                    cell(&a.ward_name),
                    cell(&a.room_number),
                    cell(&a.reason),
                    cell(&a.status),
                ]
            })
            .collect(),
        Category::Visit => aggregate
            .visits
            .iter()
            .map(|v| {
                vec![
                    date(v.visit_date),
                    cell(&v.department_name),
                    cell(&v.doctor_name),
                    cell(&v.chief_complaint),
                    cell(&v.outcome),
                ]
            })
            .collect(),
        Category::Vitals => aggregate
            .vitals
            .iter()
            .map(|v| {
                let pressure = match (v.systolic, v.diastolic) {
                    (Some(sys), Some(dia)) => {
                        format!("{}/{}", format_reading(sys), format_reading(dia))
                    }
                    _ => EMPTY_CELL.to_string(),
                };
                vec![
                    v.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
                    pressure,
                    reading(v.heart_rate),
                    reading(v.temperature),
                    reading(v.oxygen_saturation),
                    reading(v.weight),
                    reading(v.respiratory_rate),
                ]
            })
            .collect(),
        Category::Lab => aggregate
            .labs
            .iter()
            .map(|lab| {
                let result = match (&lab.result_value, &lab.result_units) {
                    (Some(value), Some(units)) => format!("{value} {units}"),
                    (Some(value), None) => value.clone(),
                    (None, _) => "Pending".to_string(),
                };
                vec![
                    date(lab.order_date),
                    lab.test_name.clone(),
                    result,
                    cell(&lab.reference_range),
                    cell(&lab.flag),
                    cell(&lab.status),
                ]
            })
            .collect(),
        Category::Prescription => aggregate
            .prescriptions
            .iter()
            .map(|p| {
                vec![
                    date(p.prescribed_date),
                    cell(&p.prescriber_name),
                    medications(&p.items),
                    cell(&p.status),
                ]
            })
            .collect(),
        Category::Procedure => aggregate
            .procedures
            .iter()
            .map(|p| {
                vec![
                    date(p.procedure_date),
                    p.procedure_name.clone(),
                    cell(&p.surgeon_name),
                    cell(&p.diagnosis),
                    cell(&p.status),
                ]
            })
            .collect(),
        Category::Document => aggregate
            .documents
            .iter()
            .map(|d| vec![date(d.uploaded_at), d.document_name.clone(), cell(&d.document_type)])
            .collect(),
        Category::Note => aggregate
            .notes
            .iter()
            .map(|n| {
                vec![
                    date(n.note_date),
                    cell(&n.note_type),
                    cell(&n.author_name),
                    truncate_chars(&n.content, NOTE_CELL_CHARS),
                ]
            })
            .collect(),
    }
}

fn date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn cell(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(EMPTY_CELL)
        .to_string()
}

fn reading(value: Option<f64>) -> String {
    value
        .filter(|value| value.is_finite())
        .map(format_reading)
        .unwrap_or_else(|| EMPTY_CELL.to_string())
}

fn medications(items: &[MedicationItem]) -> String {
    if items.is_empty() {
        return EMPTY_CELL.to_string();
    }
    items
        .iter()
        .map(|item| match &item.dosage {
            Some(dosage) => format!("{} {}", item.medication_name, dosage),
            None => item.medication_name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
