use std::fs;

use history_core::{
    build_timeline, summarize, Category, EventCategory, HistoryConfig, LoadStatus,
};
use history_normalize::{
    normalize_admissions, normalize_aggregate_str, normalize_snapshot_value, unwrap_collection,
};
use serde_json::{json, Value};

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn fixture(name: &str) -> Value {
    let raw = fs::read_to_string(fixture_path(name)).expect("fixture should be readable");
    serde_json::from_str(&raw).expect("fixture should be valid JSON")
}

#[test]
fn admissions_match_golden() {
    let admissions = normalize_admissions(&fixture("admission_items.json")).expect("normalizes");
    let actual = serde_json::to_value(&admissions).expect("serializes");
    assert_eq!(actual, fixture("admissions_golden.json"));
}

#[test]
fn wrapper_shapes_normalize_identically() {
    let items = fixture("admission_items.json");
    let bare = normalize_admissions(&items).unwrap();
    let data = normalize_admissions(&json!({ "data": items.clone() })).unwrap();
    let keyed = normalize_admissions(&json!({ "admissions": items.clone() })).unwrap();
    let nested = normalize_admissions(&json!({ "data": { "admissions": items } })).unwrap();

    assert_eq!(bare.len(), 2);
    assert_eq!(bare, data);
    assert_eq!(bare, keyed);
    assert_eq!(bare, nested);
}

#[test]
fn every_category_accepts_its_wrapper_key() {
    let keyed = [
        (Category::Admission, "admissions"),
        (Category::Visit, "appointments"),
        (Category::Vitals, "vitals"),
        (Category::Lab, "orders"),
        (Category::Prescription, "prescriptions"),
        (Category::Procedure, "procedures"),
        (Category::Document, "documents"),
        (Category::Note, "notes"),
    ];
    for (category, key) in keyed {
        let payload = json!({ key: [{ "id": "x" }] });
        let items = unwrap_collection(&payload, category).expect("keyed payload unwraps");
        assert_eq!(items.len(), 1, "{category}");
    }
}

#[test]
fn mixed_snapshot_builds_expected_timeline() {
    let raw = fs::read_to_string(fixture_path("patient_history.json")).unwrap();
    let aggregate = normalize_aggregate_str(&raw).expect("snapshot normalizes");

    assert_eq!(aggregate.visits[0].doctor_name.as_deref(), Some("Dr. Sanjay Mehta"));
    assert_eq!(aggregate.prescriptions[0].prescriber_name.as_deref(), Some("Dr. Sanjay Mehta"));
    assert_eq!(aggregate.prescriptions[0].items.len(), 2);
    assert_eq!(aggregate.notes[0].author_name.as_deref(), Some("Nurse Kavya"));
    assert!(aggregate.documents.is_empty());
    assert!(aggregate.procedures.is_empty());

    let timeline = build_timeline(&aggregate, &HistoryConfig::default());
    let tags: Vec<EventCategory> = timeline.iter().map(|entry| entry.category).collect();
    assert_eq!(
        tags,
        vec![
            EventCategory::Visit,
            EventCategory::Prescription,
            EventCategory::Discharge,
            EventCategory::Vitals,
            EventCategory::Note,
            EventCategory::Lab,
            EventCategory::Vitals,
            EventCategory::Admission,
        ]
    );
    assert_eq!(timeline[0].title, "OPD Visit - Pulmonology");
    assert_eq!(timeline[5].description, "Result: Pending");

    let summary = summarize(&aggregate);
    assert_eq!(summary.pending_labs, 1);
    let heart = summary
        .statistic(history_core::VitalMetric::HeartRate)
        .expect("heart rate statistic");
    assert_eq!(heart.samples, 1);
    assert_eq!(heart.average, Some(92.0));
}

#[test]
fn one_unreadable_section_keeps_the_other_seven() {
    let snapshot = json!({
        "admissions": [{ "id": "a1", "admissionDate": "2024-01-10" }],
        "visits": { "data": [{ "id": "v1", "visitDate": "2024-01-11" }] },
        "vitals": { "error": "Internal" },
        "labs": [{ "id": "l1", "orderDate": "2024-01-12", "testName": "CBC" }],
        "prescriptions": [{ "id": "p1", "prescribedDate": "2024-01-13" }],
        "procedures": [
            { "id": "pr1", "procedureDate": "2024-01-14", "procedureName": "Appendectomy" }
        ],
        "documents": [{ "id": "d1", "uploadedAt": "2024-01-15", "documentName": "CT.pdf" }],
        "notes": [{ "id": "n1", "noteDate": "2024-01-16", "content": "Stable" }]
    });

    let normalized = normalize_snapshot_value(&snapshot).expect("snapshot is an object");
    let failed: Vec<Category> = normalized.failures.iter().map(|f| f.category).collect();
    assert_eq!(failed, vec![Category::Vitals]);
    assert!(normalized.failures[0].message.contains("vitals"));
    assert_eq!(normalized.status(), LoadStatus::Partial);

    let summary = summarize(&normalized.aggregate);
    for category in Category::ALL {
        let expected = usize::from(category != Category::Vitals);
        assert_eq!(summary.count(category), expected, "{category}");
    }
}

#[test]
fn every_section_unreadable_is_a_failed_load() {
    let sections = [
        "admissions",
        "visits",
        "vitals",
        "labs",
        "prescriptions",
        "procedures",
        "documents",
        "notes",
    ];
    let snapshot: serde_json::Map<String, Value> =
        sections.iter().map(|key| (key.to_string(), json!(42))).collect();

    let normalized = normalize_snapshot_value(&Value::Object(snapshot)).unwrap();
    assert_eq!(normalized.failures.len(), Category::ALL.len());
    assert_eq!(normalized.status(), LoadStatus::Failed);
    assert!(normalize_snapshot_value(&json!("not a snapshot")).is_err());
}

#[test]
fn success_envelope_with_null_data_is_empty() {
    let payload = json!({ "success": true, "data": null });
    for category in Category::ALL {
        assert!(unwrap_collection(&payload, category).unwrap().is_empty());
    }
    assert!(normalize_admissions(&payload).unwrap().is_empty());
}
