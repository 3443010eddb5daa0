//! Where each history category is served.

use history_core::{Category, PatientId};

const PATIENT_SEGMENT: &str = "{patientId}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub category: Category,
    /// Path template; `{patientId}` is substituted with the encoded id.
    pub path: &'static str,
    /// Fixed query parameters sent alongside the patient filter.
    pub params: Params,
}

impl Endpoint {
    /// Path with the patient substituted when it is part of the route.
    pub fn path_for(&self, patient: &PatientId) -> String {
        self.path
            .replace(PATIENT_SEGMENT, &urlencoding::encode(patient.as_str()))
    }

    /// Query string: `patientId` when the route does not carry it, then the
    /// fixed parameters.
    pub fn query_for<'a>(&self, patient: &'a PatientId) -> Vec<(&'a str, &'a str)> {
        let mut query = Vec::with_capacity(self.params.len() + 1);
        if !self.path.contains(PATIENT_SEGMENT) {
            query.push(("patientId", patient.as_str()));
        }
        let params: &[(&'a str, &'a str)] = self.params;
        query.extend(params.iter().copied());
        query
    }
}

type Params = &'static [(&'static str, &'static str)];

const NO_PARAMS: Params = &[];
const COMPLETED_ONLY: Params = &[("status", "completed")];

pub fn endpoint(category: Category) -> Endpoint {
    let (path, params) = match category {
        Category::Admission => ("/ipd/admissions", NO_PARAMS),
        Category::Visit => ("/appointments", COMPLETED_ONLY),
        Category::Vitals => ("/vitals/patient/{patientId}", NO_PARAMS),
        Category::Lab => ("/laboratory/orders", NO_PARAMS),
        Category::Prescription => ("/pharmacy/prescriptions", NO_PARAMS),
        Category::Procedure => ("/procedures", NO_PARAMS),
        Category::Document => ("/documents/patient/{patientId}", NO_PARAMS),
        Category::Note => ("/clinical-notes", NO_PARAMS),
    };
    Endpoint {
        category,
        path,
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_patient_is_substituted_and_encoded() {
        let patient = PatientId::new("P 10/7").unwrap();
        let vitals = endpoint(Category::Vitals);
        assert_eq!(vitals.path_for(&patient), "/vitals/patient/P%2010%2F7");
        assert!(vitals.query_for(&patient).is_empty());
    }

    #[test]
    fn query_patient_comes_before_fixed_params() {
        let patient = PatientId::new("P-1").unwrap();
        let visits = endpoint(Category::Visit);
        assert_eq!(visits.path_for(&patient), "/appointments");
        assert_eq!(
            visits.query_for(&patient),
            vec![("patientId", "P-1"), ("status", "completed")]
        );
    }

    #[test]
    fn every_category_has_its_own_route() {
        let routes: Vec<Endpoint> = Category::ALL.into_iter().map(endpoint).collect();
        for (route, category) in routes.iter().zip(Category::ALL) {
            assert_eq!(route.category, category);
            assert_eq!(routes.iter().filter(|other| other.path == route.path).count(), 1);
        }
    }
}
