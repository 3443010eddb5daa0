//! At-a-glance counts and vitals statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Category, HistoryAggregate, VitalSignsRecord};

/// A single vitals measurement tracked over time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VitalMetric {
    Systolic,
    Diastolic,
    HeartRate,
    Temperature,
    OxygenSaturation,
    Weight,
    RespiratoryRate,
}

impl VitalMetric {
    pub const ALL: [VitalMetric; 7] = [
        VitalMetric::Systolic,
        VitalMetric::Diastolic,
        VitalMetric::HeartRate,
        VitalMetric::Temperature,
        VitalMetric::OxygenSaturation,
        VitalMetric::Weight,
        VitalMetric::RespiratoryRate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VitalMetric::Systolic => "Systolic BP",
            VitalMetric::Diastolic => "Diastolic BP",
            VitalMetric::HeartRate => "Heart rate",
            VitalMetric::Temperature => "Temperature",
            VitalMetric::OxygenSaturation => "SpO2",
            VitalMetric::Weight => "Weight",
            VitalMetric::RespiratoryRate => "Respiratory rate",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            VitalMetric::Systolic | VitalMetric::Diastolic => Some("mmHg"),
            VitalMetric::HeartRate => Some("bpm"),
            VitalMetric::Temperature => None,
            VitalMetric::OxygenSaturation => Some("%"),
            VitalMetric::Weight => Some("kg"),
            VitalMetric::RespiratoryRate => Some("/min"),
        }
    }

    /// Reading for this metric; absent, non-finite and zero values count as missing.
    pub fn read(self, record: &VitalSignsRecord) -> Option<f64> {
        let value = match self {
            VitalMetric::Systolic => record.systolic,
            VitalMetric::Diastolic => record.diastolic,
            VitalMetric::HeartRate => record.heart_rate,
            VitalMetric::Temperature => record.temperature,
            VitalMetric::OxygenSaturation => record.oxygen_saturation,
            VitalMetric::Weight => record.weight,
            VitalMetric::RespiratoryRate => record.respiratory_rate,
        }?;
        (value.is_finite() && value != 0.0).then_some(value)
    }
}

/// Latest value and mean for one metric. `None` means no valid readings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalStatistic {
    pub metric: VitalMetric,
    pub latest: Option<f64>,
    pub latest_at: Option<DateTime<Utc>>,
    pub average: Option<f64>,
    pub samples: usize,
}

/// One point of a vitals chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalTrendPoint {
    pub recorded_at: DateTime<Utc>,
    pub value: f64,
}

/// Time series for one metric, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalTrend {
    pub metric: VitalMetric,
    pub unit: Option<String>,
    pub points: Vec<VitalTrendPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HistorySummary {
    pub admissions: usize,
    pub visits: usize,
    pub vitals: usize,
    pub labs: usize,
    pub prescriptions: usize,
    pub procedures: usize,
    pub documents: usize,
    pub notes: usize,
    pub active_admissions: usize,
    pub pending_labs: usize,
    pub abnormal_labs: usize,
    #[serde(default)]
    pub vital_statistics: Vec<VitalStatistic>,
    #[serde(default)]
    pub vital_trends: Vec<VitalTrend>,
}

impl HistorySummary {
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Admission => self.admissions,
            Category::Visit => self.visits,
            Category::Vitals => self.vitals,
            Category::Lab => self.labs,
            Category::Prescription => self.prescriptions,
            Category::Procedure => self.procedures,
            Category::Document => self.documents,
            Category::Note => self.notes,
        }
    }

    pub fn statistic(&self, metric: VitalMetric) -> Option<&VitalStatistic> {
        self.vital_statistics.iter().find(|stat| stat.metric == metric)
    }
}

/// Summarize the loaded aggregate.
pub fn summarize(aggregate: &HistoryAggregate) -> HistorySummary {
    let mut vitals: Vec<&VitalSignsRecord> = aggregate.vitals.iter().collect();
    vitals.sort_by_key(|record| record.recorded_at);

    HistorySummary {
        admissions: aggregate.admissions.len(),
        visits: aggregate.visits.len(),
        vitals: aggregate.vitals.len(),
        labs: aggregate.labs.len(),
        prescriptions: aggregate.prescriptions.len(),
        procedures: aggregate.procedures.len(),
        documents: aggregate.documents.len(),
        notes: aggregate.notes.len(),
        active_admissions: aggregate
            .admissions
            .iter()
            .filter(|admission| admission.discharge_date.is_none())
            .count(),
        pending_labs: aggregate.labs.iter().filter(|lab| lab.is_pending()).count(),
        abnormal_labs: aggregate.labs.iter().filter(|lab| lab.is_abnormal()).count(),
        vital_statistics: VitalMetric::ALL
            .iter()
            .map(|metric| vital_statistic(*metric, &vitals))
            .collect(),
        vital_trends: VitalMetric::ALL
            .iter()
            .filter_map(|metric| vital_trend(*metric, &vitals))
            .collect(),
    }
}

/// `chronological` must be sorted oldest first.
fn vital_statistic(metric: VitalMetric, chronological: &[&VitalSignsRecord]) -> VitalStatistic {
    let readings: Vec<(DateTime<Utc>, f64)> = chronological
        .iter()
        .filter_map(|record| metric.read(record).map(|value| (record.recorded_at, value)))
        .collect();

    let average = if readings.is_empty() {
        None
    } else {
        Some(readings.iter().map(|(_, value)| value).sum::<f64>() / readings.len() as f64)
    };
    let latest = readings.last().copied();

    VitalStatistic {
        metric,
        latest: latest.map(|(_, value)| value),
        latest_at: latest.map(|(at, _)| at),
        average,
        samples: readings.len(),
    }
}

fn vital_trend(metric: VitalMetric, chronological: &[&VitalSignsRecord]) -> Option<VitalTrend> {
    let points: Vec<VitalTrendPoint> = chronological
        .iter()
        .filter_map(|record| {
            metric.read(record).map(|value| VitalTrendPoint {
                recorded_at: record.recorded_at,
                value,
            })
        })
        .collect();

    if points.is_empty() {
        return None;
    }

    Some(VitalTrend {
        metric,
        unit: metric.unit().map(str::to_string),
        points,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{AdmissionRecord, LabTestRecord};

    fn vitals(
        id: &str,
        day: u32,
        heart_rate: Option<f64>,
        weight: Option<f64>,
    ) -> VitalSignsRecord {
        VitalSignsRecord {
            id: id.into(),
            recorded_at: Utc.with_ymd_and_hms(2024, 4, day, 9, 0, 0).unwrap(),
            systolic: None,
            diastolic: None,
            heart_rate,
            temperature: None,
            oxygen_saturation: None,
            weight,
            respiratory_rate: None,
            recorded_by: None,
        }
    }

    #[test]
    fn mean_skips_missing_and_zero_readings() {
        let aggregate = HistoryAggregate {
            vitals: vec![
                vitals("v3", 3, Some(90.0), Some(0.0)),
                vitals("v1", 1, Some(70.0), None),
                vitals("v2", 2, None, Some(72.5)),
            ],
            ..Default::default()
        };
        let summary = summarize(&aggregate);

        let heart = summary.statistic(VitalMetric::HeartRate).unwrap();
        assert_eq!(heart.samples, 2);
        assert_eq!(heart.average, Some(80.0));
        assert_eq!(heart.latest, Some(90.0));

        let weight = summary.statistic(VitalMetric::Weight).unwrap();
        assert_eq!(weight.samples, 1);
        assert_eq!(weight.latest, Some(72.5));
        assert_eq!(weight.latest_at, Some(Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap()));
    }

    #[test]
    fn no_valid_readings_is_no_data() {
        let aggregate = HistoryAggregate {
            vitals: vec![vitals("v1", 1, Some(0.0), None)],
            ..Default::default()
        };
        let summary = summarize(&aggregate);
        let heart = summary.statistic(VitalMetric::HeartRate).unwrap();
        assert_eq!(heart.average, None);
        assert_eq!(heart.latest, None);
        assert_eq!(heart.samples, 0);
        assert!(summary.vital_trends.is_empty());
    }

    #[test]
    fn trends_are_chronological() {
        let aggregate = HistoryAggregate {
            vitals: vec![vitals("v2", 9, Some(88.0), None), vitals("v1", 2, Some(76.0), None)],
            ..Default::default()
        };
        let summary = summarize(&aggregate);
        assert_eq!(summary.vital_trends.len(), 1);
        let values: Vec<f64> = summary.vital_trends[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![76.0, 88.0]);
        assert_eq!(summary.vital_trends[0].unit.as_deref(), Some("bpm"));
    }

    #[test]
    fn counts_include_lab_and_admission_flags() {
        let ordered = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let lab = |id: &str, value: Option<&str>, flag: Option<&str>| LabTestRecord {
            id: id.into(),
            order_id: None,
            order_date: ordered,
            test_name: "Potassium".into(),
            category: None,
            result_value: value.map(str::to_string),
            result_units: None,
            reference_range: None,
            flag: flag.map(str::to_string),
            status: None,
        };
        let aggregate = HistoryAggregate {
            admissions: vec![AdmissionRecord {
                id: "a1".into(),
                admission_date: ordered,
                discharge_date: None,
                ward_name: None,
                room_number: None,
                reason: None,
                status: None,
            }],
            labs: vec![
                lab("l1", None, None),
                lab("l2", Some("5.9"), Some("HIGH")),
                lab("l3", Some("4.1"), Some("normal")),
            ],
            ..Default::default()
        };
        let summary = summarize(&aggregate);
        assert_eq!(summary.count(Category::Lab), 3);
        assert_eq!(summary.pending_labs, 1);
        assert_eq!(summary.abnormal_labs, 1);
        assert_eq!(summary.active_admissions, 1);
        assert_eq!(summary.count(Category::Note), 0);
    }
}
