//! Framework-neutral JavaScript bridge over the history pipeline.
//!
//! Every entry point takes the raw snapshot object the frontend assembled
//! from the eight history endpoints and normalizes it first.

use history_core::{
    build_timeline, filter_timeline, summarize, HistoryAggregate, HistoryConfig, HistorySummary,
    TimelineEntry,
};
use history_normalize::{normalize_snapshot_value, NormalizeError, NormalizedSnapshot};
use serde::Deserialize;
use serde_json::Value;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsHistoryConfig {
    #[serde(default)]
    page_size: Option<usize>,
    #[serde(default)]
    note_preview_chars: Option<usize>,
}

impl From<JsHistoryConfig> for HistoryConfig {
    fn from(cfg: JsHistoryConfig) -> Self {
        let mut base = HistoryConfig::default();
        if let Some(size) = cfg.page_size.filter(|size| *size > 0) {
            base.page_size = size;
        }
        if let Some(chars) = cfg.note_preview_chars {
            base.note_preview_chars = chars;
        }
        base
    }
}

/// The normalized aggregate plus one failure per section that could not be
/// read. Unreadable sections are empty in the aggregate.
#[wasm_bindgen(js_name = normalizeHistory)]
pub fn normalize_history(snapshot: JsValue) -> Result<JsValue, JsValue> {
    install_panic_hook();
    let normalized = snapshot_from_js(snapshot)?;
    to_js(&normalized)
}

/// Timeline entries, newest first, optionally narrowed by a search query.
#[wasm_bindgen(js_name = historyTimeline)]
pub fn history_timeline(
    snapshot: JsValue,
    query: Option<String>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    install_panic_hook();
    let aggregate = aggregate_from_js(snapshot)?;
    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsHistoryConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("could not read config: {err}")))?;
            HistoryConfig::from(cfg)
        }
        None => HistoryConfig::default(),
    };
    to_js(&timeline(&aggregate, query.as_deref(), &cfg))
}

#[wasm_bindgen(js_name = summarizeHistory)]
pub fn summarize_history(snapshot: JsValue) -> Result<JsValue, JsValue> {
    install_panic_hook();
    let aggregate = aggregate_from_js(snapshot)?;
    let summary: HistorySummary = summarize(&aggregate);
    to_js(&summary)
}

fn install_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn snapshot_from_js(snapshot: JsValue) -> Result<NormalizedSnapshot, JsValue> {
    let value = from_value::<Value>(snapshot)
        .map_err(|err| JsValue::from_str(&format!("could not read history snapshot: {err}")))?;
    normalize_snapshot_value(&value)
        .map_err(|err| JsValue::from_str(&format_normalize_error(err)))
}

fn aggregate_from_js(snapshot: JsValue) -> Result<HistoryAggregate, JsValue> {
    snapshot_from_js(snapshot).map(|normalized| normalized.aggregate)
}

fn timeline(
    aggregate: &HistoryAggregate,
    query: Option<&str>,
    cfg: &HistoryConfig,
) -> Vec<TimelineEntry> {
    let entries = build_timeline(aggregate, cfg);
    filter_timeline(&entries, query).into_iter().cloned().collect()
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|err| JsValue::from_str(&format!("could not serialize result: {err}")))
}

fn format_normalize_error(err: NormalizeError) -> String {
    format!("History error: {err}")
}

#[cfg(test)]
mod tests {
    use history_core::LoadStatus;
    use serde_json::json;

    use super::*;

    #[test]
    fn js_config_overrides_only_given_fields() {
        let cfg = HistoryConfig::from(JsHistoryConfig {
            page_size: Some(0),
            note_preview_chars: Some(40),
        });
        assert_eq!(cfg.page_size, HistoryConfig::default().page_size);
        assert_eq!(cfg.note_preview_chars, 40);
    }

    #[test]
    fn query_narrows_the_timeline() {
        let snapshot = json!({
            "admissions": [{
                "id": "a1",
                "admissionDate": "2024-01-10T08:00:00Z",
                "dischargeDate": "2024-01-15T08:00:00Z",
                "reason": "Appendicitis"
            }],
            "documents": { "data": [{
                "id": "d1",
                "uploadedAt": "2024-01-16T08:00:00Z",
                "documentName": "Discharge summary.pdf"
            }]}
        });
        let aggregate = normalize_snapshot_value(&snapshot).unwrap().aggregate;
        let cfg = HistoryConfig::default();

        assert_eq!(timeline(&aggregate, None, &cfg).len(), 3);
        let appendix = timeline(&aggregate, Some("APPENDICITIS"), &cfg);
        assert_eq!(appendix.len(), 1);
        assert_eq!(appendix[0].id, "a1-admission");
    }

    #[test]
    fn malformed_section_keeps_other_categories() {
        let snapshot = json!({
            "vitals": 42,
            "notes": [{ "id": "n1", "noteDate": "2024-01-16", "content": "Stable" }]
        });
        let normalized = normalize_snapshot_value(&snapshot).unwrap();
        assert_eq!(normalized.aggregate.notes.len(), 1);
        assert_eq!(normalized.failures.len(), 1);
        assert!(normalized.failures[0].message.contains("vitals"));
        assert_eq!(normalized.status(), LoadStatus::Partial);

        let cfg = HistoryConfig::default();
        assert_eq!(timeline(&normalized.aggregate, None, &cfg).len(), 1);
    }

    #[test]
    fn non_object_snapshot_is_rejected() {
        let err = normalize_snapshot_value(&json!(42)).unwrap_err();
        let message = format_normalize_error(err);
        assert!(message.starts_with("History error:"), "{message}");
        assert!(message.contains("expected a history object"), "{message}");
    }
}
