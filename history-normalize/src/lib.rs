//! Backend JSON payloads to canonical history records.
//!
//! Each history endpoint answers with a bare array, a `{ "data": [...] }`
//! envelope, or an object keyed by the category name. Field names drift
//! between services (camelCase, snake_case, nested objects), so every field is
//! resolved through a short list of aliases. Optional fields that are missing
//! or blank stay `None`; display placeholders are left to the presentation
//! layer.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use history_core::{
    AdmissionRecord, Category, CategoryFailure, ClinicalNoteRecord, DocumentRecord,
    HistoryAggregate, LabTestRecord, LoadStatus, MedicationItem, PrescriptionRecord,
    ProcedureRecord, VisitRecord, VitalSignsRecord,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("unexpected {found} payload for {category} records")]
    UnexpectedShape {
        category: Category,
        found: &'static str,
    },
    #[error("could not read payload: {0}")]
    Parse(String),
}

/// Keys under which a category's list may be wrapped.
pub fn collection_keys(category: Category) -> &'static [&'static str] {
    match category {
        Category::Admission => &["admissions", "items"],
        Category::Visit => &["appointments", "visits", "items"],
        Category::Vitals => &["vitals", "vitalSigns", "items"],
        Category::Lab => &["orders", "labOrders", "labTests", "items"],
        Category::Prescription => &["prescriptions", "items"],
        Category::Procedure => &["procedures", "items"],
        Category::Document => &["documents", "items"],
        Category::Note => &["notes", "clinicalNotes", "items"],
    }
}

/// Locate the record list inside a payload.
///
/// Accepts `[...]`, `{ "data": [...] }`, `{ "<key>": [...] }` and
/// `{ "data": { "<key>": [...] } }`. `null` is an empty list.
pub fn unwrap_collection(payload: &Value, category: Category) -> Result<&[Value], NormalizeError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(&[]),
        Value::Object(map) => {
            if let Some(data) = map.get("data") {
                match data {
                    Value::Array(items) => return Ok(items),
                    Value::Object(_) => return unwrap_keyed(data, category),
                    Value::Null => return Ok(&[]),
                    _ => {}
                }
            }
            unwrap_keyed(payload, category)
        }
        other => Err(NormalizeError::UnexpectedShape {
            category,
            found: json_kind(other),
        }),
    }
}

fn unwrap_keyed(object: &Value, category: Category) -> Result<&[Value], NormalizeError> {
    collection_keys(category)
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .ok_or(NormalizeError::UnexpectedShape {
            category,
            found: "object",
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A snapshot normalized category by category. A section that cannot be
/// read becomes an empty list plus a failure; the other sections are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedSnapshot {
    pub aggregate: HistoryAggregate,
    pub failures: Vec<CategoryFailure>,
}

impl NormalizedSnapshot {
    pub fn status(&self) -> LoadStatus {
        LoadStatus::from_failures(self.failures.len())
    }
}

/// Parse a whole snapshot object (`{ "admissions": ..., "labs": ..., ... }`)
/// from a string. Missing categories are empty.
pub fn normalize_snapshot_str(snapshot: &str) -> Result<NormalizedSnapshot, NormalizeError> {
    let value: Value =
        serde_json::from_str(snapshot).map_err(|err| NormalizeError::Parse(err.to_string()))?;
    normalize_snapshot_value(&value)
}

/// Only a snapshot that is not a JSON object is an error.
pub fn normalize_snapshot_value(snapshot: &Value) -> Result<NormalizedSnapshot, NormalizeError> {
    if !snapshot.is_object() {
        return Err(NormalizeError::Parse(format!(
            "expected a history object, received {}",
            json_kind(snapshot)
        )));
    }
    static ABSENT: Value = Value::Null;
    let section = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| snapshot.get(*key))
            .unwrap_or(&ABSENT)
    };

    let mut failures = Vec::new();
    let aggregate = HistoryAggregate {
        admissions: settle_section(
            Category::Admission,
            normalize_admissions(section(&["admissions"])),
            &mut failures,
        ),
        visits: settle_section(
            Category::Visit,
            normalize_visits(section(&["visits", "appointments"])),
            &mut failures,
        ),
        vitals: settle_section(
            Category::Vitals,
            normalize_vitals(section(&["vitals", "vitalSigns"])),
            &mut failures,
        ),
        labs: settle_section(
            Category::Lab,
            normalize_labs(section(&["labs", "labTests", "labOrders"])),
            &mut failures,
        ),
        prescriptions: settle_section(
            Category::Prescription,
            normalize_prescriptions(section(&["prescriptions"])),
            &mut failures,
        ),
        procedures: settle_section(
            Category::Procedure,
            normalize_procedures(section(&["procedures"])),
            &mut failures,
        ),
        documents: settle_section(
            Category::Document,
            normalize_documents(section(&["documents"])),
            &mut failures,
        ),
        notes: settle_section(
            Category::Note,
            normalize_notes(section(&["notes", "clinicalNotes"])),
            &mut failures,
        ),
    };

    Ok(NormalizedSnapshot {
        aggregate,
        failures,
    })
}

/// Like [`normalize_snapshot_str`], keeping only the aggregate.
pub fn normalize_aggregate_str(snapshot: &str) -> Result<HistoryAggregate, NormalizeError> {
    normalize_snapshot_str(snapshot).map(|normalized| normalized.aggregate)
}

pub fn normalize_aggregate_value(snapshot: &Value) -> Result<HistoryAggregate, NormalizeError> {
    normalize_snapshot_value(snapshot).map(|normalized| normalized.aggregate)
}

fn settle_section<T>(
    category: Category,
    result: Result<Vec<T>, NormalizeError>,
    failures: &mut Vec<CategoryFailure>,
) -> Vec<T> {
    result.unwrap_or_else(|err| {
        warn!(%category, error = %err, "snapshot section unreadable, showing no records");
        failures.push(CategoryFailure::new(category, err.to_string()));
        Vec::new()
    })
}

pub fn normalize_admissions(payload: &Value) -> Result<Vec<AdmissionRecord>, NormalizeError> {
    collect(payload, Category::Admission, |item, index| {
        let admission_date = required_date(
            item,
            &["admissionDate", "admission_date", "admittedAt", "admitted_at", "admitDate"],
            Category::Admission,
            index,
        )?;
        Some(AdmissionRecord {
            id: record_id(item, &["admissionId"], Category::Admission, index),
            admission_date,
            discharge_date: datetime(item, &["dischargeDate", "discharge_date", "dischargedAt"]),
            ward_name: nested_name(item, &["ward", "wardName", "ward_name"]),
            room_number: room_label(item),
            reason: text(
                item,
                &["reason", "admissionReason", "reasonForAdmission", "diagnosis"],
            ),
            status: text(item, &["status"]),
        })
    })
}

pub fn normalize_visits(payload: &Value) -> Result<Vec<VisitRecord>, NormalizeError> {
    collect(payload, Category::Visit, |item, index| {
        let date_keys = [
            "visitDate",
            "visit_date",
            "appointmentDate",
            "appointment_date",
            "scheduledAt",
            "date",
        ];
        let time_keys = ["appointmentTime", "startTime", "time"];
        let visit_date = match date_with_time(item, &date_keys, &time_keys) {
            Some(date) => date,
            None => {
                warn_dropped(Category::Visit, index, "date");
                return None;
            }
        };
        Some(VisitRecord {
            id: record_id(item, &["appointmentId", "visitId"], Category::Visit, index),
            visit_date,
            department_name: nested_name(
                item,
                &["department", "departmentName", "department_name"],
            ),
            doctor_name: nested_name(item, &["doctor", "doctorName", "doctor_name", "provider"])
                .map(|name| doctor_display_name(&name)),
            chief_complaint: text(
                item,
                &["chiefComplaint", "chief_complaint", "reasonForVisit", "reason"],
            ),
            outcome: text(item, &["outcome", "diagnosis", "visitOutcome"]),
        })
    })
}

pub fn normalize_vitals(payload: &Value) -> Result<Vec<VitalSignsRecord>, NormalizeError> {
    collect(payload, Category::Vitals, |item, index| {
        let recorded_at = required_date(
            item,
            &["recordedAt", "recorded_at", "measuredAt", "createdAt", "date"],
            Category::Vitals,
            index,
        )?;
        let (bp_systolic, bp_diastolic) = blood_pressure(item);
        Some(VitalSignsRecord {
            id: record_id(item, &["vitalId"], Category::Vitals, index),
            recorded_at,
            systolic: number(
                item,
                &["systolic", "bloodPressureSystolic", "systolicBp", "bp_systolic"],
            )
            .or(bp_systolic),
            diastolic: number(
                item,
                &["diastolic", "bloodPressureDiastolic", "diastolicBp", "bp_diastolic"],
            )
            .or(bp_diastolic),
            heart_rate: number(item, &["heartRate", "heart_rate", "pulse", "pulseRate"]),
            temperature: number(item, &["temperature", "temp"]),
            oxygen_saturation: number(
                item,
                &["oxygenSaturation", "oxygen_saturation", "spo2", "spO2"],
            ),
            weight: number(item, &["weight"]),
            respiratory_rate: number(item, &["respiratoryRate", "respiratory_rate", "respRate"]),
            recorded_by: nested_name(item, &["recordedBy", "recorded_by", "nurse"]),
        })
    })
}

/// Lab orders may carry a nested list of tests; each test becomes one record
/// that inherits the order's id, date and status.
pub fn normalize_labs(payload: &Value) -> Result<Vec<LabTestRecord>, NormalizeError> {
    let items = unwrap_collection(payload, Category::Lab)?;
    let mut records = Vec::new();

    for (index, order) in items.iter().enumerate() {
        let Some(order_date) = required_date(
            order,
            &["orderDate", "order_date", "orderedAt", "createdAt", "date"],
            Category::Lab,
            index,
        ) else {
            continue;
        };
        let order_status = text(order, &["status"]);

        let nested = ["tests", "items", "labTests", "orderItems"]
            .iter()
            .find_map(|key| order.get(*key).and_then(Value::as_array));

        // An order with an empty test list is kept as one pending record when
        // it names its test itself.
        match nested {
            Some(tests) if !tests.is_empty() => {
                let order_id = record_id(order, &["orderId"], Category::Lab, index);
                for (position, test) in tests.iter().enumerate() {
                    let fallback_id = format!("{order_id}-{position}");
                    let record = lab_test(
                        test,
                        order_date,
                        Some(&order_id),
                        order_status.as_deref(),
                        fallback_id,
                    );
                    if let Some(record) = record {
                        records.push(record);
                    } else {
                        warn_dropped(Category::Lab, index, "test name");
                    }
                }
            }
            _ => {
                let order_id = text(order, &["orderId", "order_id"]);
                let fallback_id = format!("{}-{index}", Category::Lab);
                let record = lab_test(
                    order,
                    order_date,
                    order_id.as_deref(),
                    order_status.as_deref(),
                    fallback_id,
                );
                if let Some(record) = record {
                    records.push(record);
                } else {
                    warn_dropped(Category::Lab, index, "test name");
                }
            }
        }
    }

    Ok(records)
}

fn lab_test(
    test: &Value,
    order_date: DateTime<Utc>,
    order_id: Option<&str>,
    order_status: Option<&str>,
    fallback_id: String,
) -> Option<LabTestRecord> {
    let catalog = test.get("test").filter(|value| value.is_object());
    let test_name = text(test, &["testName", "test_name", "name"])
        .or_else(|| catalog.and_then(|entry| text(entry, &["name", "testName"])))
        .or_else(|| test.get("test").and_then(Value::as_str).and_then(clean))?;

    let result = test.get("result");
    let result_object = result.filter(|value| value.is_object());
    let result_value = text(test, &["resultValue", "result_value", "value"])
        .or_else(|| result_object.and_then(|r| text(r, &["value", "resultValue"])))
        .or_else(|| result.filter(|value| !value.is_object()).and_then(scalar_text));

    let from_result = |keys: &[&str]| result_object.and_then(|r| text(r, keys));

    Some(LabTestRecord {
        id: text(test, &["id", "_id", "testId"]).unwrap_or(fallback_id),
        order_id: order_id.map(str::to_string),
        order_date,
        test_name,
        category: text(test, &["category", "testCategory"])
            .or_else(|| catalog.and_then(|entry| text(entry, &["category"]))),
        result_value,
        result_units: text(test, &["resultUnits", "result_units", "units", "unit"])
            .or_else(|| from_result(&["units", "unit"])),
        reference_range: text(test, &["referenceRange", "reference_range", "normalRange"])
            .or_else(|| from_result(&["referenceRange", "normalRange"]))
            .or_else(|| catalog.and_then(|entry| text(entry, &["referenceRange", "normalRange"]))),
        flag: text(test, &["flag", "abnormalFlag", "interpretation"])
            .or_else(|| from_result(&["flag", "abnormalFlag"])),
        status: text(test, &["status"]).or_else(|| order_status.map(str::to_string)),
    })
}

pub fn normalize_prescriptions(payload: &Value) -> Result<Vec<PrescriptionRecord>, NormalizeError> {
    collect(payload, Category::Prescription, |item, index| {
        let prescribed_date = required_date(
            item,
            &["prescribedDate", "prescribed_date", "prescriptionDate", "createdAt", "date"],
            Category::Prescription,
            index,
        )?;
        let items: Vec<MedicationItem> = ["items", "medications", "prescriptionItems", "drugs"]
            .iter()
            .find_map(|key| item.get(*key).and_then(Value::as_array))
            .map(|lines| lines.iter().filter_map(medication_item).collect())
            .unwrap_or_default();

        Some(PrescriptionRecord {
            id: record_id(item, &["prescriptionId"], Category::Prescription, index),
            prescribed_date,
            prescriber_name: nested_name(
                item,
                &["prescriber", "doctor", "prescribedBy", "prescriberName", "doctorName"],
            )
            .map(|name| doctor_display_name(&name)),
            items,
            status: text(item, &["status"]),
        })
    })
}

fn medication_item(line: &Value) -> Option<MedicationItem> {
    let medication_name = nested_name(
        line,
        &["medicationName", "medication_name", "drugName", "name", "medication", "drug"],
    )?;
    Some(MedicationItem {
        medication_name,
        dosage: text(line, &["dosage", "dose"]),
        frequency: text(line, &["frequency"]),
        duration: text(line, &["duration"]),
        instructions: text(line, &["instructions", "notes"]),
    })
}

pub fn normalize_procedures(payload: &Value) -> Result<Vec<ProcedureRecord>, NormalizeError> {
    collect(payload, Category::Procedure, |item, index| {
        let procedure_date = required_date(
            item,
            &["procedureDate", "procedure_date", "performedAt", "scheduledDate", "date"],
            Category::Procedure,
            index,
        )?;
        let name_keys = ["procedureName", "procedure_name", "name", "procedure"];
        let Some(procedure_name) = nested_name(item, &name_keys) else {
            warn_dropped(Category::Procedure, index, "procedure name");
            return None;
        };
        Some(ProcedureRecord {
            id: record_id(item, &["procedureId"], Category::Procedure, index),
            procedure_date,
            procedure_name,
            surgeon_name: nested_name(item, &["surgeon", "surgeonName", "performedBy", "doctor"])
                .map(|name| doctor_display_name(&name)),
            diagnosis: text(item, &["diagnosis", "indication"]),
            status: text(item, &["status"]),
        })
    })
}

pub fn normalize_documents(payload: &Value) -> Result<Vec<DocumentRecord>, NormalizeError> {
    collect(payload, Category::Document, |item, index| {
        let uploaded_at = required_date(
            item,
            &["uploadedAt", "uploaded_at", "uploadDate", "createdAt", "date"],
            Category::Document,
            index,
        )?;
        let name_keys = ["documentName", "document_name", "fileName", "title", "name"];
        let Some(document_name) = text(item, &name_keys) else {
            warn_dropped(Category::Document, index, "document name");
            return None;
        };
        Some(DocumentRecord {
            id: record_id(item, &["documentId"], Category::Document, index),
            uploaded_at,
            document_name,
            document_type: text(item, &["documentType", "document_type", "type", "category"]),
            file_url: text(item, &["fileUrl", "file_url", "url", "downloadUrl"]),
        })
    })
}

pub fn normalize_notes(payload: &Value) -> Result<Vec<ClinicalNoteRecord>, NormalizeError> {
    collect(payload, Category::Note, |item, index| {
        let note_date = required_date(
            item,
            &["noteDate", "note_date", "createdAt", "date"],
            Category::Note,
            index,
        )?;
        let Some(content) = text(item, &["content", "note", "text", "body"]) else {
            warn_dropped(Category::Note, index, "content");
            return None;
        };
        Some(ClinicalNoteRecord {
            id: record_id(item, &["noteId"], Category::Note, index),
            note_date,
            note_type: text(item, &["noteType", "note_type", "type"]),
            author_name: nested_name(item, &["author", "authorName", "author_name", "createdBy"]),
            content,
        })
    })
}

/// Prefix a clinician's name with "Dr." unless it already carries the title.
pub fn doctor_display_name(name: &str) -> String {
    let name = name.trim();
    if has_doctor_title(name) {
        name.to_string()
    } else {
        format!("Dr. {name}")
    }
}

fn has_doctor_title(name: &str) -> bool {
    let mut chars = name.chars();
    let prefix: String = chars.by_ref().take(2).collect();
    if !prefix.eq_ignore_ascii_case("dr") {
        return false;
    }
    match chars.next() {
        None => true,
        Some(next) => next == '.' || next.is_whitespace(),
    }
}

/// Parse the timestamp formats the backend emits. Naive values are UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn collect<T>(
    payload: &Value,
    category: Category,
    mut build: impl FnMut(&Value, usize) -> Option<T>,
) -> Result<Vec<T>, NormalizeError> {
    let items = unwrap_collection(payload, category)?;
    Ok(items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| build(item, index))
        .collect())
}

fn warn_dropped(category: Category, index: usize, missing: &str) {
    warn!(%category, index, missing, "dropping record without required field");
}

fn required_date(
    item: &Value,
    keys: &[&str],
    category: Category,
    index: usize,
) -> Option<DateTime<Utc>> {
    let parsed = datetime(item, keys);
    if parsed.is_none() {
        warn_dropped(category, index, "date");
    }
    parsed
}

fn record_id(item: &Value, extra: &[&str], category: Category, index: usize) -> String {
    text(item, &["id", "_id"])
        .or_else(|| text(item, extra))
        .unwrap_or_else(|| format!("{category}-{index}"))
}

fn clean(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => clean(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| item.get(*key).and_then(scalar_text))
}

fn number(item: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn datetime(item: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::String(text) => parse_datetime(text),
        Value::Number(millis) => millis.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}

/// Date fields that carry only a day are combined with a separate time field.
fn date_with_time(item: &Value, date_keys: &[&str], time_keys: &[&str]) -> Option<DateTime<Utc>> {
    let date = datetime(item, date_keys)?;
    let date_only = date_keys
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .map(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").is_ok())
        .unwrap_or(false);
    if !date_only {
        return Some(date);
    }
    let time = text(item, time_keys).and_then(|raw| {
        NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .ok()
    });
    match time {
        Some(time) => Some(date.date_naive().and_time(time).and_utc()),
        None => Some(date),
    }
}

/// Display name of a person or named entity given as a string or an object.
fn name_of(value: &Value) -> Option<String> {
    if let Some(name) = scalar_text(value) {
        return Some(name);
    }
    if !value.is_object() {
        return None;
    }
    if let Some(name) = text(value, &["name", "fullName", "displayName"]) {
        return Some(name);
    }
    let first = text(value, &["firstName", "first_name"]);
    let last = text(value, &["lastName", "last_name"]);
    let joined = [first, last].into_iter().flatten().collect::<Vec<_>>().join(" ");
    if !joined.is_empty() {
        return Some(joined);
    }
    value.get("user").and_then(name_of)
}

fn nested_name(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| item.get(*key).and_then(name_of))
}

fn room_label(item: &Value) -> Option<String> {
    text(item, &["roomNumber", "room_number"]).or_else(|| {
        let room = item.get("room")?;
        if room.is_object() {
            text(room, &["roomNumber", "number", "name"])
        } else {
            scalar_text(room)
        }
    })
}

/// Split a combined `"120/80"` reading.
fn blood_pressure(item: &Value) -> (Option<f64>, Option<f64>) {
    let Some(raw) = text(item, &["bloodPressure", "blood_pressure", "bp"]) else {
        return (None, None);
    };
    match raw.split_once('/') {
        Some((systolic, diastolic)) => (
            systolic.trim().parse().ok(),
            diastolic
                .split_whitespace()
                .next()
                .and_then(|value| value.parse().ok()),
        ),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn doctor_prefix_is_not_doubled() {
        assert_eq!(doctor_display_name("Anita Rao"), "Dr. Anita Rao");
        assert_eq!(doctor_display_name("Dr. Anita Rao"), "Dr. Anita Rao");
        assert_eq!(doctor_display_name("dr Anita Rao"), "dr Anita Rao");
        assert_eq!(doctor_display_name("Drake Bell"), "Dr. Drake Bell");
    }

    #[test]
    fn parses_backend_date_formats() {
        let expected = parse_datetime("2024-01-10T08:30:00Z").unwrap();
        assert_eq!(parse_datetime("2024-01-10T08:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-10 08:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-10T08:30:00.000Z"), Some(expected));
        assert_eq!(
            parse_datetime("2024-01-10"),
            parse_datetime("2024-01-10T00:00:00Z")
        );
        assert_eq!(parse_datetime("10/01/2024"), None);
        assert_eq!(parse_datetime(""), None);
    }

    #[test]
    fn rejects_scalar_payloads() {
        let err = unwrap_collection(&json!("oops"), Category::Note).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::UnexpectedShape {
                category: Category::Note,
                found: "string"
            }
        );
        assert!(unwrap_collection(&json!({ "unrelated": [] }), Category::Note).is_err());
        assert!(unwrap_collection(&Value::Null, Category::Note).unwrap().is_empty());
    }

    #[test]
    fn nested_data_envelope_with_key() {
        let payload = json!({ "data": { "appointments": [{ "id": "v1" }] } });
        assert_eq!(unwrap_collection(&payload, Category::Visit).unwrap().len(), 1);
    }

    #[test]
    fn visit_time_is_combined_with_day() {
        let payload = json!([{
            "id": "v1",
            "appointmentDate": "2024-02-03",
            "appointmentTime": "14:15",
            "doctor": { "firstName": "Meera", "lastName": "Iyer" },
            "department": { "name": "Cardiology" }
        }]);
        let visits = normalize_visits(&payload).unwrap();
        assert_eq!(visits[0].visit_date, parse_datetime("2024-02-03T14:15:00Z").unwrap());
        assert_eq!(visits[0].doctor_name.as_deref(), Some("Dr. Meera Iyer"));
        assert_eq!(visits[0].department_name.as_deref(), Some("Cardiology"));
        assert_eq!(visits[0].outcome, None);
    }

    #[test]
    fn records_without_dates_are_dropped() {
        let payload = json!([
            { "id": "d1", "documentName": "Consent form", "uploadedAt": "not a date" },
            { "id": "d2", "documentName": "MRI report", "uploadedAt": "2024-03-01T10:00:00Z" }
        ]);
        let documents = normalize_documents(&payload).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "d2");
    }

    #[test]
    fn combined_blood_pressure_and_string_numbers() {
        let payload = json!([{
            "recordedAt": "2024-03-01T06:00:00Z",
            "bloodPressure": "128/84 mmHg",
            "heartRate": "76",
            "spo2": 97,
            "temperature": ""
        }]);
        let vitals = normalize_vitals(&payload).unwrap();
        assert_eq!(vitals[0].id, "vitals-0");
        assert_eq!(vitals[0].systolic, Some(128.0));
        assert_eq!(vitals[0].diastolic, Some(84.0));
        assert_eq!(vitals[0].heart_rate, Some(76.0));
        assert_eq!(vitals[0].oxygen_saturation, Some(97.0));
        assert_eq!(vitals[0].temperature, None);
    }

    #[test]
    fn lab_orders_expand_into_tests() {
        let payload = json!({ "orders": [{
            "id": "ord-7",
            "orderDate": "2024-01-12T09:00:00Z",
            "status": "in_progress",
            "tests": [
                { "test": { "name": "Serum Creatinine", "category": "Biochemistry" },
                  "result": { "value": "1.4", "units": "mg/dL", "flag": "HIGH" } },
                { "testName": "Hemoglobin" }
            ]
        }]});
        let labs = normalize_labs(&payload).unwrap();
        assert_eq!(labs.len(), 2);
        assert_eq!(labs[0].id, "ord-7-0");
        assert_eq!(labs[0].test_name, "Serum Creatinine");
        assert_eq!(labs[0].category.as_deref(), Some("Biochemistry"));
        assert_eq!(labs[0].result_value.as_deref(), Some("1.4"));
        assert_eq!(labs[0].flag.as_deref(), Some("HIGH"));
        assert_eq!(labs[1].result_value, None);
        assert_eq!(labs[1].status.as_deref(), Some("in_progress"));
        assert_eq!(labs[1].order_id.as_deref(), Some("ord-7"));
    }

    #[test]
    fn null_data_envelope_is_empty() {
        let payload = json!({ "success": true, "data": null });
        assert!(unwrap_collection(&payload, Category::Admission).unwrap().is_empty());
        assert!(normalize_procedures(&payload).unwrap().is_empty());
    }

    #[test]
    fn order_with_empty_test_list_stays_pending() {
        let payload = json!([
            { "id": "ord-9", "orderDate": "2024-02-01", "testName": "Lipid panel", "tests": [] },
            { "id": "ord-10", "orderDate": "2024-02-02", "tests": [] }
        ]);
        let labs = normalize_labs(&payload).unwrap();
        assert_eq!(labs.len(), 1);
        assert_eq!(labs[0].id, "ord-9");
        assert_eq!(labs[0].test_name, "Lipid panel");
        assert!(labs[0].is_pending());
    }

    #[test]
    fn unreadable_section_is_recorded_as_failure() {
        let snapshot = normalize_snapshot_value(&json!({
            "admissions": [{ "id": "a1", "admissionDate": "2024-01-10" }],
            "vitals": { "error": "Internal" }
        }))
        .unwrap();
        assert_eq!(snapshot.aggregate.admissions.len(), 1);
        assert!(snapshot.aggregate.vitals.is_empty());
        assert_eq!(snapshot.failures.len(), 1);
        assert_eq!(snapshot.failures[0].category, Category::Vitals);
        assert_eq!(snapshot.status(), LoadStatus::Partial);
    }

    #[test]
    fn snapshot_object_missing_sections_are_empty() {
        let raw = r#"{ "notes": { "data": [
            { "id": "n1", "noteDate": "2024-01-01", "content": "Seen on rounds" }
        ] } }"#;
        let aggregate = normalize_aggregate_str(raw).unwrap();
        assert_eq!(aggregate.notes.len(), 1);
        assert!(aggregate.admissions.is_empty());
        assert!(normalize_aggregate_str("[]").is_err());
    }
}
