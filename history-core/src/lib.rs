//! Core types for the patient history timeline: canonical records, categories,
//! timeline entries and the aggregate loaded for one patient.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod page;
pub mod state;
pub mod summary;
pub mod timeline;

pub use page::{paginate, Page};
pub use state::{
    CategoryFailure, HistoryAction, HistoryState, LoadStatus, SettledLoad, Slot, Transition,
};
pub use summary::{
    summarize, HistorySummary, VitalMetric, VitalStatistic, VitalTrend, VitalTrendPoint,
};
pub use timeline::{build_timeline, filter_timeline, sort_timeline, EventCategory, TimelineEntry};

/// Tunables shared by the timeline builder and the tabular views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    /// Rows per page in each category tab.
    pub page_size: usize,
    /// Characters of a clinical note shown in its timeline description.
    pub note_preview_chars: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            note_preview_chars: 100,
        }
    }
}

/// The eight record kinds fetched for a patient, in report order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Admission,
    Visit,
    Vitals,
    Lab,
    Prescription,
    Procedure,
    Document,
    Note,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Admission,
        Category::Visit,
        Category::Vitals,
        Category::Lab,
        Category::Prescription,
        Category::Procedure,
        Category::Document,
        Category::Note,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Admission => "admission",
            Category::Visit => "visit",
            Category::Vitals => "vitals",
            Category::Lab => "lab",
            Category::Prescription => "prescription",
            Category::Procedure => "procedure",
            Category::Document => "document",
            Category::Note => "note",
        }
    }

    /// Plural heading used by summaries and report sections.
    pub fn heading(self) -> &'static str {
        match self {
            Category::Admission => "Admissions",
            Category::Visit => "OPD Visits",
            Category::Vitals => "Vital Signs",
            Category::Lab => "Lab Tests",
            Category::Prescription => "Prescriptions",
            Category::Procedure => "Procedures",
            Category::Document => "Documents",
            Category::Note => "Clinical Notes",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifier of the patient whose history is loaded. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientId(String);

impl PatientId {
    pub fn new(raw: impl Into<String>) -> Result<Self, HistoryError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HistoryError::InvalidPatientId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PatientId {
    type Error = HistoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One inpatient stay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRecord {
    pub id: String,
    pub admission_date: DateTime<Utc>,
    pub discharge_date: Option<DateTime<Utc>>,
    pub ward_name: Option<String>,
    pub room_number: Option<String>,
    pub reason: Option<String>,
    pub status: Option<String>,
}

/// One outpatient encounter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub id: String,
    pub visit_date: DateTime<Utc>,
    pub department_name: Option<String>,
    pub doctor_name: Option<String>,
    pub chief_complaint: Option<String>,
    pub outcome: Option<String>,
}

/// One vitals capture. Every reading is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VitalSignsRecord {
    pub id: String,
    pub recorded_at: DateTime<Utc>,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub heart_rate: Option<f64>,
    pub temperature: Option<f64>,
    pub oxygen_saturation: Option<f64>,
    pub weight: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub recorded_by: Option<String>,
}

/// One lab test, possibly still waiting for its result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabTestRecord {
    pub id: String,
    pub order_id: Option<String>,
    pub order_date: DateTime<Utc>,
    pub test_name: String,
    pub category: Option<String>,
    pub result_value: Option<String>,
    pub result_units: Option<String>,
    pub reference_range: Option<String>,
    pub flag: Option<String>,
    pub status: Option<String>,
}

impl LabTestRecord {
    pub fn is_pending(&self) -> bool {
        self.result_value.is_none()
    }

    /// A flag other than "normal" marks the result as out of range.
    pub fn is_abnormal(&self) -> bool {
        match self.flag.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(flag) => !(flag.eq_ignore_ascii_case("normal") || flag.eq_ignore_ascii_case("n")),
        }
    }
}

/// One prescription event with its medication lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRecord {
    pub id: String,
    pub prescribed_date: DateTime<Utc>,
    pub prescriber_name: Option<String>,
    pub items: Vec<MedicationItem>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationItem {
    pub medication_name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

/// One surgical or procedural event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureRecord {
    pub id: String,
    pub procedure_date: DateTime<Utc>,
    pub procedure_name: String,
    pub surgeon_name: Option<String>,
    pub diagnosis: Option<String>,
    pub status: Option<String>,
}

/// Reference to an uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub uploaded_at: DateTime<Utc>,
    pub document_name: String,
    pub document_type: Option<String>,
    pub file_url: Option<String>,
}

/// Free-text clinical note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalNoteRecord {
    pub id: String,
    pub note_date: DateTime<Utc>,
    pub note_type: Option<String>,
    pub author_name: Option<String>,
    pub content: String,
}

/// Everything loaded for one patient, one list per category.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAggregate {
    #[serde(default)]
    pub admissions: Vec<AdmissionRecord>,
    #[serde(default)]
    pub visits: Vec<VisitRecord>,
    #[serde(default)]
    pub vitals: Vec<VitalSignsRecord>,
    #[serde(default)]
    pub labs: Vec<LabTestRecord>,
    #[serde(default)]
    pub prescriptions: Vec<PrescriptionRecord>,
    #[serde(default)]
    pub procedures: Vec<ProcedureRecord>,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub notes: Vec<ClinicalNoteRecord>,
}

impl HistoryAggregate {
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Admission => self.admissions.len(),
            Category::Visit => self.visits.len(),
            Category::Vitals => self.vitals.len(),
            Category::Lab => self.labs.len(),
            Category::Prescription => self.prescriptions.len(),
            Category::Procedure => self.procedures.len(),
            Category::Document => self.documents.len(),
            Category::Note => self.notes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|category| self.count(*category) == 0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("patient identifier must not be blank")]
    InvalidPatientId,
}
