use std::path::PathBuf;

use chrono::NaiveDate;
use history_core::{Category, HistoryAggregate};
use history_report::{
    build_report, export_report, layout_report, render_pdf, save_report, PageGeometry,
    ReportSubject,
};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn load_fixture(name: &str) -> HistoryAggregate {
    let raw = std::fs::read_to_string(fixture_path(name)).unwrap();
    history_normalize::normalize_aggregate_str(&raw).unwrap()
}

fn subject() -> ReportSubject {
    ReportSubject {
        name: Some("Asha Verma".into()),
        identifier: Some("MRN-20931".into()),
    }
}

fn generated_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
}

#[test]
fn report_has_only_non_empty_sections() {
    let aggregate = load_fixture("two_admissions.json");
    let report = build_report(&aggregate, &subject(), generated_on());

    assert_eq!(report.tables.len(), 1);
    assert_eq!(report.tables[0].category, Category::Admission);
    assert_eq!(report.tables[0].rows.len(), 2);
    assert!(report.table(Category::Lab).is_none());
    assert_eq!(report.subject_lines()[1], "MRN: MRN-20931");

    let pages = layout_report(&report, &PageGeometry::a4());
    assert_eq!(pages.len(), 1);
    let headings: Vec<&str> = pages[0].headings().collect();
    assert_eq!(headings, vec!["Summary", "Admissions"]);
}

#[test]
fn rendered_report_is_a_pdf() {
    let aggregate = load_fixture("two_admissions.json");
    let bytes = render_pdf(&build_report(&aggregate, &subject(), generated_on())).unwrap();
    assert_eq!(&bytes[0..4], b"%PDF");
}

#[test]
fn export_writes_named_file_into_new_directory() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("exports").join("history");
    let aggregate = load_fixture("two_admissions.json");

    let path = export_report(&aggregate, &subject(), generated_on(), &target).unwrap();

    assert_eq!(
        path.file_name().and_then(|name| name.to_str()),
        Some("Medical_History_Asha_Verma_2024-03-09.pdf")
    );
    let written = std::fs::read(&path).unwrap();
    assert_eq!(&written[0..4], b"%PDF");
}

#[test]
fn save_into_a_file_path_fails_with_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let err = save_report(b"%PDF-1.3", &blocker, "report.pdf").unwrap_err();
    assert!(err.to_string().contains("not-a-dir"));
}
