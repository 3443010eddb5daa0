//! Per-category history fetches.
//!
//! Every category has two entry points. `try_*` reports what went wrong;
//! the plain variant logs the failure and hands back an empty list, so a
//! single broken service never blanks the rest of the history.

use serde_json::Value;
use tracing::{debug, warn};

use history_core::{
    AdmissionRecord, Category, ClinicalNoteRecord, DocumentRecord, LabTestRecord, PatientId,
    PrescriptionRecord, ProcedureRecord, VisitRecord, VitalSignsRecord,
};
use history_normalize::{
    normalize_admissions, normalize_documents, normalize_labs, normalize_notes,
    normalize_prescriptions, normalize_procedures, normalize_visits, normalize_vitals,
};

use crate::endpoints::endpoint;
use crate::{ApiClient, FetchError};

pub struct HistoryFetcher<C> {
    client: C,
}

impl<C: ApiClient> HistoryFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn fetch_payload(
        &self,
        category: Category,
        patient_id: &str,
    ) -> Result<Value, FetchError> {
        let patient = PatientId::new(patient_id)?;
        let endpoint = endpoint(category);
        let path = endpoint.path_for(&patient);
        debug!(%category, %patient, %path, "fetching history category");
        Ok(self.client.get(&path, &endpoint.query_for(&patient)).await?)
    }
}

macro_rules! category_fetchers {
    ($($name:ident, $try_name:ident, $category:expr, $normalize:path => $record:ty;)+) => {
        impl<C: ApiClient> HistoryFetcher<C> {
            $(
                pub async fn $try_name(
                    &self,
                    patient_id: &str,
                ) -> Result<Vec<$record>, FetchError> {
                    let payload = self.fetch_payload($category, patient_id).await?;
                    let records = $normalize(&payload)?;
                    let count = records.len();
                    debug!(category = %$category, records = count, "history category loaded");
                    Ok(records)
                }

                pub async fn $name(&self, patient_id: &str) -> Vec<$record> {
                    or_empty($category, patient_id, self.$try_name(patient_id).await)
                }
            )+
        }
    };
}

category_fetchers! {
    admissions, try_admissions, Category::Admission, normalize_admissions => AdmissionRecord;
    visits, try_visits, Category::Visit, normalize_visits => VisitRecord;
    vitals, try_vitals, Category::Vitals, normalize_vitals => VitalSignsRecord;
    labs, try_labs, Category::Lab, normalize_labs => LabTestRecord;
    prescriptions, try_prescriptions, Category::Prescription,
        normalize_prescriptions => PrescriptionRecord;
    procedures, try_procedures, Category::Procedure, normalize_procedures => ProcedureRecord;
    documents, try_documents, Category::Document, normalize_documents => DocumentRecord;
    notes, try_notes, Category::Note, normalize_notes => ClinicalNoteRecord;
}

fn or_empty<T>(category: Category, patient_id: &str, result: Result<Vec<T>, FetchError>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        warn!(%category, patient_id, error = %err, "history fetch failed, showing no records");
        Vec::new()
    })
}
