//! One load cycle: all eight categories fetched together and settled.
//!
//! The fetches run concurrently inside a single `tokio::join!`, so the
//! cycle completes only once every category has either produced records or
//! failed. Each outcome is captured in its own slot; nothing short-circuits.
//! Cycles are numbered so that a late answer from a superseded reload is
//! recognised as stale by `HistoryState::apply`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{info, warn};

use history_core::{
    Category, CategoryFailure, HistoryAction, HistoryState, PatientId, SettledLoad, Slot,
    Transition,
};

use crate::{ApiClient, FetchError, HistoryFetcher};

/// A started load cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub patient_id: PatientId,
}

impl LoadTicket {
    pub fn started(&self) -> HistoryAction {
        HistoryAction::LoadStarted {
            generation: self.generation,
            patient_id: self.patient_id.clone(),
        }
    }
}

pub struct HistoryLoader<C> {
    fetcher: HistoryFetcher<C>,
    generation: AtomicU64,
}

impl<C: ApiClient> HistoryLoader<C> {
    pub fn new(client: C) -> Self {
        Self {
            fetcher: HistoryFetcher::new(client),
            generation: AtomicU64::new(0),
        }
    }

    pub fn fetcher(&self) -> &HistoryFetcher<C> {
        &self.fetcher
    }

    /// Validate the patient and allocate the next generation.
    pub fn begin(&self, patient_id: &str) -> Result<LoadTicket, FetchError> {
        let patient_id = PatientId::new(patient_id)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(LoadTicket {
            generation,
            patient_id,
        })
    }

    /// Fetch every category for the ticket's patient and wait for all of them.
    pub async fn settle(&self, ticket: LoadTicket) -> SettledLoad {
        let fetcher = &self.fetcher;
        let patient = ticket.patient_id.as_str();

        let (admissions, visits, vitals, labs, prescriptions, procedures, documents, notes) =
            tokio::join!(
                capture(Category::Admission, fetcher.try_admissions(patient)),
                capture(Category::Visit, fetcher.try_visits(patient)),
                capture(Category::Vitals, fetcher.try_vitals(patient)),
                capture(Category::Lab, fetcher.try_labs(patient)),
                capture(Category::Prescription, fetcher.try_prescriptions(patient)),
                capture(Category::Procedure, fetcher.try_procedures(patient)),
                capture(Category::Document, fetcher.try_documents(patient)),
                capture(Category::Note, fetcher.try_notes(patient)),
            );

        let failed = [
            admissions.is_err(),
            visits.is_err(),
            vitals.is_err(),
            labs.is_err(),
            prescriptions.is_err(),
            procedures.is_err(),
            documents.is_err(),
            notes.is_err(),
        ]
        .into_iter()
        .filter(|failed| *failed)
        .count();
        info!(
            generation = ticket.generation,
            patient = %ticket.patient_id,
            failed,
            "history load settled"
        );

        SettledLoad {
            generation: ticket.generation,
            patient_id: ticket.patient_id,
            admissions,
            visits,
            vitals,
            labs,
            prescriptions,
            procedures,
            documents,
            notes,
        }
    }

    pub async fn load(&self, patient_id: &str) -> Result<SettledLoad, FetchError> {
        let ticket = self.begin(patient_id)?;
        Ok(self.settle(ticket).await)
    }

    /// Run a full cycle against `state`: mark it loading, then apply the result.
    pub async fn refresh(
        &self,
        state: &mut HistoryState,
        patient_id: &str,
    ) -> Result<Transition, FetchError> {
        let ticket = self.begin(patient_id)?;
        state.apply(ticket.started());
        let settled = self.settle(ticket).await;
        Ok(state.apply(HistoryAction::LoadSettled(settled)))
    }
}

async fn capture<T>(
    category: Category,
    fetch: impl Future<Output = Result<Vec<T>, FetchError>>,
) -> Slot<T> {
    fetch.await.map_err(|err| {
        warn!(%category, error = %err, "history category failed");
        CategoryFailure::new(category, err.to_string())
    })
}
