//! Aggregate state for one patient's history and its single transition
//! function.
//!
//! Every load cycle carries a generation number. A settled load whose
//! generation is older than the state's current one is dropped, so a slow
//! response from an earlier reload can never overwrite a newer snapshot.

use serde::{Deserialize, Serialize};

use crate::{
    AdmissionRecord, Category, ClinicalNoteRecord, DocumentRecord, HistoryAggregate,
    LabTestRecord, PatientId, PrescriptionRecord, ProcedureRecord, VisitRecord,
    VitalSignsRecord,
};

/// Why one category came back empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryFailure {
    pub category: Category,
    pub message: String,
}

impl CategoryFailure {
    pub fn new(category: Category, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

pub type Slot<T> = Result<Vec<T>, CategoryFailure>;

/// Outcome of all eight fetches of one load cycle, each captured separately.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledLoad {
    pub generation: u64,
    pub patient_id: PatientId,
    pub admissions: Slot<AdmissionRecord>,
    pub visits: Slot<VisitRecord>,
    pub vitals: Slot<VitalSignsRecord>,
    pub labs: Slot<LabTestRecord>,
    pub prescriptions: Slot<PrescriptionRecord>,
    pub procedures: Slot<ProcedureRecord>,
    pub documents: Slot<DocumentRecord>,
    pub notes: Slot<ClinicalNoteRecord>,
}

impl SettledLoad {
    /// Split into the aggregate (failed slots empty) and the failures.
    pub fn into_parts(self) -> (HistoryAggregate, Vec<CategoryFailure>) {
        let mut failures = Vec::new();
        let aggregate = HistoryAggregate {
            admissions: settle(self.admissions, &mut failures),
            visits: settle(self.visits, &mut failures),
            vitals: settle(self.vitals, &mut failures),
            labs: settle(self.labs, &mut failures),
            prescriptions: settle(self.prescriptions, &mut failures),
            procedures: settle(self.procedures, &mut failures),
            documents: settle(self.documents, &mut failures),
            notes: settle(self.notes, &mut failures),
        };
        (aggregate, failures)
    }
}

fn settle<T>(slot: Slot<T>, failures: &mut Vec<CategoryFailure>) -> Vec<T> {
    slot.unwrap_or_else(|failure| {
        failures.push(failure);
        Vec::new()
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    /// Every category loaded.
    Ready,
    /// Some categories failed and are shown empty.
    Partial,
    /// Every category failed; nothing shown is known to be "no history".
    Failed,
}

impl LoadStatus {
    /// Status of a settled load given how many categories failed.
    pub fn from_failures(failed: usize) -> Self {
        match failed {
            0 => LoadStatus::Ready,
            n if n >= Category::ALL.len() => LoadStatus::Failed,
            _ => LoadStatus::Partial,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryAction {
    LoadStarted { generation: u64, patient_id: PatientId },
    LoadSettled(SettledLoad),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Stale,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryState {
    pub patient_id: Option<PatientId>,
    pub generation: u64,
    pub status: LoadStatus,
    pub aggregate: HistoryAggregate,
    pub failures: Vec<CategoryFailure>,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            patient_id: None,
            generation: 0,
            status: LoadStatus::Idle,
            aggregate: HistoryAggregate::default(),
            failures: Vec::new(),
        }
    }
}

impl HistoryState {
    pub fn apply(&mut self, action: HistoryAction) -> Transition {
        match action {
            HistoryAction::LoadStarted {
                generation,
                patient_id,
            } => {
                if generation <= self.generation {
                    return Transition::Stale;
                }
                if self.patient_id.as_ref() != Some(&patient_id) {
                    self.aggregate = HistoryAggregate::default();
                }
                self.generation = generation;
                self.patient_id = Some(patient_id);
                self.status = LoadStatus::Loading;
                self.failures.clear();
                Transition::Applied
            }
            HistoryAction::LoadSettled(settled) => {
                if settled.generation < self.generation {
                    return Transition::Stale;
                }
                self.generation = settled.generation;
                self.patient_id = Some(settled.patient_id.clone());

                let (aggregate, failures) = settled.into_parts();
                self.status = LoadStatus::from_failures(failures.len());
                self.aggregate = aggregate;
                self.failures = failures;
                Transition::Applied
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    pub fn failed_categories(&self) -> Vec<Category> {
        self.failures.iter().map(|failure| failure.category).collect()
    }
}
