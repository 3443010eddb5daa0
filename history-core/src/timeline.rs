//! Merge of all record categories into one chronological timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AdmissionRecord, Category, ClinicalNoteRecord, DocumentRecord, HistoryAggregate,
    HistoryConfig, LabTestRecord, PrescriptionRecord, ProcedureRecord, VisitRecord,
    VitalSignsRecord,
};

/// Tag shown on a timeline entry. Declaration order is the tie-break rank for
/// entries sharing a timestamp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Admission,
    Discharge,
    Visit,
    Vitals,
    Lab,
    Prescription,
    Procedure,
    Document,
    Note,
}

impl EventCategory {
    pub fn label(self) -> &'static str {
        match self {
            EventCategory::Admission => "admission",
            EventCategory::Discharge => "discharge",
            EventCategory::Visit => "visit",
            EventCategory::Vitals => "vitals",
            EventCategory::Lab => "lab",
            EventCategory::Prescription => "prescription",
            EventCategory::Procedure => "procedure",
            EventCategory::Document => "document",
            EventCategory::Note => "note",
        }
    }

    /// Record category the entry was derived from.
    pub fn source(self) -> Category {
        match self {
            EventCategory::Admission | EventCategory::Discharge => Category::Admission,
            EventCategory::Visit => Category::Visit,
            EventCategory::Vitals => Category::Vitals,
            EventCategory::Lab => Category::Lab,
            EventCategory::Prescription => Category::Prescription,
            EventCategory::Procedure => Category::Procedure,
            EventCategory::Document => Category::Document,
            EventCategory::Note => Category::Note,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            EventCategory::Admission => "blue",
            EventCategory::Discharge => "green",
            EventCategory::Visit => "cyan",
            EventCategory::Vitals => "red",
            EventCategory::Lab => "purple",
            EventCategory::Prescription => "orange",
            EventCategory::Procedure => "magenta",
            EventCategory::Document => "geekblue",
            EventCategory::Note => "gold",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            EventCategory::Admission => "medicine-box",
            EventCategory::Discharge => "export",
            EventCategory::Visit => "user",
            EventCategory::Vitals => "heart",
            EventCategory::Lab => "experiment",
            EventCategory::Prescription => "file-text",
            EventCategory::Procedure => "scissor",
            EventCategory::Document => "file",
            EventCategory::Note => "edit",
        }
    }
}

/// Display-ready projection of one clinical record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    pub category: EventCategory,
    pub title: String,
    pub description: String,
    pub color: String,
    pub icon: String,
}

impl TimelineEntry {
    fn new(
        id: String,
        date: DateTime<Utc>,
        category: EventCategory,
        title: String,
        description: String,
    ) -> Self {
        Self {
            id,
            date,
            category,
            title,
            description,
            color: category.color().to_string(),
            icon: category.icon().to_string(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.category.label().contains(needle)
    }
}

/// Build the merged timeline, newest first.
///
/// Entries sharing a timestamp are ordered by [`EventCategory`] rank and then
/// by id, so the result is identical across runs.
pub fn build_timeline(aggregate: &HistoryAggregate, config: &HistoryConfig) -> Vec<TimelineEntry> {
    let mut entries = Vec::new();

    for admission in &aggregate.admissions {
        entries.extend(admission_entries(admission));
    }
    entries.extend(aggregate.visits.iter().map(visit_entry));
    entries.extend(aggregate.vitals.iter().map(vitals_entry));
    entries.extend(aggregate.labs.iter().map(lab_entry));
    entries.extend(aggregate.prescriptions.iter().map(prescription_entry));
    entries.extend(aggregate.procedures.iter().map(procedure_entry));
    entries.extend(aggregate.documents.iter().map(document_entry));
    entries.extend(
        aggregate
            .notes
            .iter()
            .map(|note| note_entry(note, config.note_preview_chars)),
    );

    sort_timeline(&mut entries);
    entries
}

/// Sort descending by timestamp with the deterministic tie-break.
pub fn sort_timeline(entries: &mut [TimelineEntry]) {
    entries.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Keep entries whose title, description or category contains `query`,
/// ignoring case. The query is matched as given, surrounding whitespace
/// included; only an absent or empty query keeps everything. Order is
/// preserved.
pub fn filter_timeline<'a>(
    entries: &'a [TimelineEntry],
    query: Option<&str>,
) -> Vec<&'a TimelineEntry> {
    let needle = query.unwrap_or_default().to_lowercase();
    if needle.is_empty() {
        return entries.iter().collect();
    }
    entries.iter().filter(|entry| entry.matches(&needle)).collect()
}

fn admission_entries(admission: &AdmissionRecord) -> Vec<TimelineEntry> {
    let title = match admission.reason.as_deref() {
        Some(reason) => format!("Admitted - {reason}"),
        None => "Admitted".to_string(),
    };

    let mut parts = Vec::new();
    if let Some(ward) = &admission.ward_name {
        parts.push(format!("Ward: {ward}"));
    }
    if let Some(room) = &admission.room_number {
        parts.push(format!("Room: {room}"));
    }
    if let Some(status) = &admission.status {
        parts.push(format!("Status: {status}"));
    }

    let mut entries = vec![TimelineEntry::new(
        format!("{}-admission", admission.id),
        admission.admission_date,
        EventCategory::Admission,
        title,
        parts.join(", "),
    )];

    if let Some(discharged_at) = admission.discharge_date {
        let description = match &admission.ward_name {
            Some(ward) => format!("Discharged from {ward}"),
            None => "Discharged from inpatient care".to_string(),
        };
        entries.push(TimelineEntry::new(
            format!("{}-discharge", admission.id),
            discharged_at,
            EventCategory::Discharge,
            "Discharged".to_string(),
            description,
        ));
    }

    entries
}

fn visit_entry(visit: &VisitRecord) -> TimelineEntry {
    let title = match visit.department_name.as_deref() {
        Some(department) => format!("OPD Visit - {department}"),
        None => "OPD Visit".to_string(),
    };
    let description = [visit.doctor_name.as_deref(), visit.chief_complaint.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" - ");

    TimelineEntry::new(
        visit.id.clone(),
        visit.visit_date,
        EventCategory::Visit,
        title,
        description,
    )
}

fn vitals_entry(vitals: &VitalSignsRecord) -> TimelineEntry {
    let mut parts = Vec::new();
    if let (Some(systolic), Some(diastolic)) = (vitals.systolic, vitals.diastolic) {
        parts.push(format!(
            "BP: {}/{} mmHg",
            format_reading(systolic),
            format_reading(diastolic)
        ));
    }
    if let Some(rate) = vitals.heart_rate {
        parts.push(format!("HR: {} bpm", format_reading(rate)));
    }
    if let Some(temperature) = vitals.temperature {
        parts.push(format!("Temp: {}", format_reading(temperature)));
    }
    if let Some(spo2) = vitals.oxygen_saturation {
        parts.push(format!("SpO2: {}%", format_reading(spo2)));
    }
    if let Some(weight) = vitals.weight {
        parts.push(format!("Weight: {} kg", format_reading(weight)));
    }

    let description = if parts.is_empty() {
        "No readings recorded".to_string()
    } else {
        parts.join(", ")
    };

    TimelineEntry::new(
        vitals.id.clone(),
        vitals.recorded_at,
        EventCategory::Vitals,
        "Vital Signs Recorded".to_string(),
        description,
    )
}

fn lab_entry(lab: &LabTestRecord) -> TimelineEntry {
    let description = match (&lab.result_value, &lab.result_units) {
        (Some(value), Some(units)) => format!("Result: {value} {units}"),
        (Some(value), None) => format!("Result: {value}"),
        (None, _) => "Result: Pending".to_string(),
    };

    TimelineEntry::new(
        lab.id.clone(),
        lab.order_date,
        EventCategory::Lab,
        format!("Lab Test - {}", lab.test_name),
        description,
    )
}

fn prescription_entry(prescription: &PrescriptionRecord) -> TimelineEntry {
    let title = match prescription.prescriber_name.as_deref() {
        Some(prescriber) => format!("Prescription by {prescriber}"),
        None => "Prescription".to_string(),
    };
    let names = prescription
        .items
        .iter()
        .map(|item| item.medication_name.as_str())
        .collect::<Vec<_>>();
    let description = match names.len() {
        0 => "No medications listed".to_string(),
        1 => format!("1 medication: {}", names[0]),
        n => format!("{n} medications: {}", names.join(", ")),
    };

    TimelineEntry::new(
        prescription.id.clone(),
        prescription.prescribed_date,
        EventCategory::Prescription,
        title,
        description,
    )
}

fn procedure_entry(procedure: &ProcedureRecord) -> TimelineEntry {
    let mut parts = Vec::new();
    if let Some(surgeon) = &procedure.surgeon_name {
        parts.push(format!("Surgeon: {surgeon}"));
    }
    if let Some(diagnosis) = &procedure.diagnosis {
        parts.push(format!("Diagnosis: {diagnosis}"));
    }

    TimelineEntry::new(
        procedure.id.clone(),
        procedure.procedure_date,
        EventCategory::Procedure,
        format!("Procedure - {}", procedure.procedure_name),
        parts.join(", "),
    )
}

fn document_entry(document: &DocumentRecord) -> TimelineEntry {
    TimelineEntry::new(
        document.id.clone(),
        document.uploaded_at,
        EventCategory::Document,
        format!("Document Uploaded - {}", document.document_name),
        document.document_type.clone().unwrap_or_default(),
    )
}

fn note_entry(note: &ClinicalNoteRecord, preview_chars: usize) -> TimelineEntry {
    let title = match note.note_type.as_deref().map(str::trim) {
        Some(kind) if kind.to_lowercase().ends_with("note") => capitalize_first(kind),
        Some(kind) if !kind.is_empty() => format!("{} Note", capitalize_first(kind)),
        _ => "Clinical Note".to_string(),
    };

    TimelineEntry::new(
        note.id.clone(),
        note.note_date,
        EventCategory::Note,
        title,
        truncate_chars(&note.content, preview_chars),
    )
}

/// Render a numeric reading without trailing zeros.
pub fn format_reading(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else if ((value * 10.0).fract()).abs() < 1e-9 {
        format!("{value:.1}")
    } else {
        format!("{value:.2}")
    }
}

/// Trim and cut to `limit` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit).collect();
    format!("{}...", head.trim_end())
}

fn capitalize_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
