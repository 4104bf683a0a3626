//! Dataset-level KPIs and per-group delivery summaries.
//!
//! Every function here tolerates missing columns and dirty values: absent
//! data turns into zero counts or empty collections, never an error.

use std::collections::BTreeMap;

use chrono::Datelike;
use polars::prelude::{AnyValue, DataFrame};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::data::DeliveryRecord;
use crate::distance::Point;

/// Rows included in [`DatasetSummary::head`].
pub const SUMMARY_HEAD_ROWS: usize = 5;

/// Weekday labels in histogram order.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Headline metrics for a delivery log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSet {
    pub total_deliveries: usize,
    pub unique_drones: usize,
    pub unique_service_points: usize,
    /// Mean distance between consecutive deliveries, rounded to 2 decimals
    pub avg_distance: f64,
}

/// Compute the KPI set for `records`.
pub fn kpis(records: &[DeliveryRecord]) -> KpiSet {
    KpiSet {
        total_deliveries: records.len(),
        unique_drones: count_distinct(records.iter().map(|r| r.drone_id.as_deref())),
        unique_service_points: count_distinct(records.iter().map(|r| r.service_point.as_deref())),
        avg_distance: round2(average_consecutive_distance(records)),
    }
}

/// Mean Euclidean distance between each pair of consecutive valid delivery
/// coordinates, in stored order. Zero with fewer than two valid coordinates.
pub fn average_consecutive_distance(records: &[DeliveryRecord]) -> f64 {
    let points: Vec<Point> = records.iter().filter_map(|r| r.delivery_point()).collect();
    if points.len() < 2 {
        return 0.0;
    }
    let total: f64 = points.windows(2).map(|w| w[0].distance(&w[1])).sum();
    total / (points.len() - 1) as f64
}

fn count_distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> usize {
    let mut seen: Vec<&str> = values.flatten().collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Where a service point's coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    /// An explicit service-point coordinate recorded in the data.
    Canonical,
    /// The mean of the group's delivery coordinates.
    DeliveryMean,
}

/// A named service point with a resolved coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServicePointSummary {
    pub name: String,
    pub lng: f64,
    pub lat: f64,
    pub source: CoordinateSource,
}

/// Outcome of resolving one service-point group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServicePointResolution {
    Resolved(ServicePointSummary),
    /// Neither a canonical coordinate nor any valid delivery coordinate exists.
    Unresolved { name: String, deliveries: usize },
}

#[derive(Default)]
struct GroupAccumulator {
    canonical_lng: Option<f64>,
    canonical_lat: Option<f64>,
    sum_lng: f64,
    sum_lat: f64,
    located: usize,
    deliveries: usize,
}

impl GroupAccumulator {
    fn push(&mut self, record: &DeliveryRecord) {
        self.deliveries += 1;
        self.canonical_lng = self.canonical_lng.or(record.service_point_lng);
        self.canonical_lat = self.canonical_lat.or(record.service_point_lat);
        if let Some(p) = record.delivery_point() {
            self.sum_lng += p.lng;
            self.sum_lat += p.lat;
            self.located += 1;
        }
    }

    fn resolve(self, name: String) -> ServicePointResolution {
        if let (Some(lng), Some(lat)) = (self.canonical_lng, self.canonical_lat) {
            return ServicePointResolution::Resolved(ServicePointSummary {
                name,
                lng,
                lat,
                source: CoordinateSource::Canonical,
            });
        }
        if self.located == 0 {
            return ServicePointResolution::Unresolved {
                name,
                deliveries: self.deliveries,
            };
        }
        let n = self.located as f64;
        ServicePointResolution::Resolved(ServicePointSummary {
            name,
            lng: self.sum_lng / n,
            lat: self.sum_lat / n,
            source: CoordinateSource::DeliveryMean,
        })
    }
}

/// Resolve a coordinate for every distinct service-point name, sorted by name.
///
/// The first non-missing canonical longitude and latitude win; otherwise the
/// mean delivery coordinate of the group is used. Records without a name are
/// ignored.
pub fn resolve_service_points(records: &[DeliveryRecord]) -> Vec<ServicePointResolution> {
    let mut groups: BTreeMap<&str, GroupAccumulator> = BTreeMap::new();
    for record in records {
        if let Some(name) = record.service_point.as_deref() {
            groups.entry(name).or_default().push(record);
        }
    }
    groups
        .into_iter()
        .map(|(name, acc)| acc.resolve(name.to_string()))
        .collect()
}

/// Resolved service points only; unresolved groups are logged and dropped.
pub fn service_points(records: &[DeliveryRecord]) -> Vec<ServicePointSummary> {
    resolve_service_points(records)
        .into_iter()
        .filter_map(|resolution| match resolution {
            ServicePointResolution::Resolved(summary) => Some(summary),
            ServicePointResolution::Unresolved { name, deliveries } => {
                warn!(service_point = %name, deliveries, "service point has no usable coordinate");
                None
            }
        })
        .collect()
}

/// Delivery counts per service point, in order of first appearance.
pub fn deliveries_per_service_point(records: &[DeliveryRecord]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for name in records.iter().filter_map(|r| r.service_point.as_deref()) {
        match counts.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name.to_string(), 1)),
        }
    }
    counts
}

/// Delivery counts per drone, split by service point. Both levels sorted by key.
pub fn deliveries_by_drone_and_service_point(
    records: &[DeliveryRecord],
) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for record in records {
        if let (Some(drone), Some(name)) = (&record.drone_id, &record.service_point) {
            *counts
                .entry(drone.clone())
                .or_default()
                .entry(name.clone())
                .or_default() += 1;
        }
    }
    counts
}

/// Delivery counts per weekday, Monday first. Unparseable dates are skipped.
pub fn deliveries_by_weekday(records: &[DeliveryRecord]) -> [usize; 7] {
    let mut counts = [0; 7];
    for date in records.iter().filter_map(DeliveryRecord::date) {
        counts[date.weekday().num_days_from_monday() as usize] += 1;
    }
    counts
}

/// Delivery counts per hour of day. Unparseable times are skipped.
pub fn deliveries_by_hour(records: &[DeliveryRecord]) -> [usize; 24] {
    let mut counts = [0; 24];
    for hour in records.iter().filter_map(DeliveryRecord::hour) {
        counts[hour as usize] += 1;
    }
    counts
}

/// Declared type and missing-value count of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub missing: usize,
}

/// Shape, column types, missing counts and leading rows of a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub column_summaries: Vec<ColumnSummary>,
    pub head: Vec<Map<String, Value>>,
}

/// Summarise a raw delivery table for diagnostic display.
pub fn dataset_summary(frame: &DataFrame) -> DatasetSummary {
    let column_summaries = frame
        .get_columns()
        .iter()
        .map(|column| ColumnSummary {
            name: column.name().to_string(),
            dtype: column.dtype().to_string(),
            missing: column.null_count(),
        })
        .collect();

    DatasetSummary {
        rows: frame.height(),
        columns: frame.width(),
        column_summaries,
        head: head_rows(frame, SUMMARY_HEAD_ROWS),
    }
}

/// The first `n` rows as JSON objects keyed by column name.
pub fn head_rows(frame: &DataFrame, n: usize) -> Vec<Map<String, Value>> {
    let rows = n.min(frame.height());
    (0..rows)
        .map(|i| {
            frame
                .get_columns()
                .iter()
                .map(|column| {
                    let value = column.get(i).map(any_value_to_json).unwrap_or(Value::Null);
                    (column.name().to_string(), value)
                })
                .collect()
        })
        .collect()
}

fn any_value_to_json(value: AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => float_to_json(f64::from(v)),
        AnyValue::Float64(v) => float_to_json(v),
        other => Value::String(other.to_string()),
    }
}

/// NaN and infinities have no JSON form.
fn float_to_json(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_kpis_counts() {
        let records = vec![
            DeliveryRecord::at(0.0, 0.0).with_drone("A").with_service_point("X"),
            DeliveryRecord::at(3.0, 4.0).with_drone("A").with_service_point("X"),
            DeliveryRecord::at(3.0, 4.0).with_drone("B").with_service_point("Y"),
        ];
        let kpis = kpis(&records);

        assert_eq!(kpis.total_deliveries, 3);
        assert_eq!(kpis.unique_drones, 2);
        assert_eq!(kpis.unique_service_points, 2);
        assert_eq!(kpis.avg_distance, 2.5);
    }

    #[test]
    fn test_kpis_missing_columns() {
        let records = vec![DeliveryRecord::default(), DeliveryRecord::default()];
        let kpis = kpis(&records);
        assert_eq!(kpis.total_deliveries, 2);
        assert_eq!(kpis.unique_drones, 0);
        assert_eq!(kpis.unique_service_points, 0);
        assert_eq!(kpis.avg_distance, 0.0);
    }

    #[test]
    fn test_avg_distance_rounding_and_single_record() {
        let records = vec![DeliveryRecord::at(0.0, 0.0), DeliveryRecord::at(1.0, 1.0)];
        assert_eq!(kpis(&records).avg_distance, 1.41);
        assert_eq!(kpis(&records[..1]).avg_distance, 0.0);
        assert_eq!(kpis(&[]).avg_distance, 0.0);
    }

    #[test]
    fn test_service_point_prefers_canonical() {
        let records = vec![
            DeliveryRecord::at(10.0, 20.0)
                .with_service_point("Hub")
                .with_service_point_coord(10.0, 20.0),
            DeliveryRecord::at(12.0, 22.0).with_service_point("Hub"),
        ];
        let points = service_points(&records);

        assert_eq!(points.len(), 1);
        assert_eq!((points[0].lng, points[0].lat), (10.0, 20.0));
        assert_eq!(points[0].source, CoordinateSource::Canonical);
    }

    #[test]
    fn test_service_point_falls_back_to_mean() {
        let records = vec![
            DeliveryRecord::at(1.0, 1.0).with_service_point("B"),
            DeliveryRecord::at(3.0, 5.0).with_service_point("B"),
            DeliveryRecord::at(7.0, 7.0).with_service_point("A"),
        ];
        let points = service_points(&records);

        assert_eq!(points[0].name, "A");
        assert_eq!(points[1].name, "B");
        assert_eq!((points[1].lng, points[1].lat), (2.0, 3.0));
        assert_eq!(points[1].source, CoordinateSource::DeliveryMean);
    }

    #[test]
    fn test_unresolved_service_point() {
        let records = vec![
            DeliveryRecord::default().with_service_point("Ghost"),
            DeliveryRecord::at(1.0, 2.0).with_service_point("Real"),
            DeliveryRecord::at(5.0, 5.0),
        ];
        let resolutions = resolve_service_points(&records);

        assert_eq!(resolutions.len(), 2);
        assert_eq!(
            resolutions[0],
            ServicePointResolution::Unresolved {
                name: "Ghost".to_string(),
                deliveries: 1
            }
        );
        assert_eq!(service_points(&records).len(), 1);
    }

    #[test]
    fn test_group_counts() {
        let records = vec![
            DeliveryRecord::default().with_drone("2").with_service_point("Y"),
            DeliveryRecord::default().with_drone("1").with_service_point("X"),
            DeliveryRecord::default().with_drone("1").with_service_point("Y"),
            DeliveryRecord::default().with_drone("1").with_service_point("Y"),
        ];

        assert_eq!(
            deliveries_per_service_point(&records),
            vec![("Y".to_string(), 3), ("X".to_string(), 1)]
        );

        let stacked = deliveries_by_drone_and_service_point(&records);
        assert_eq!(stacked["1"]["Y"], 2);
        assert_eq!(stacked["1"]["X"], 1);
        assert_eq!(stacked["2"]["Y"], 1);
        assert!(!stacked["2"].contains_key("X"));
    }

    #[test]
    fn test_weekday_and_hour_histograms() {
        let records = vec![
            DeliveryRecord::default().with_date("2025-01-06").with_time("09:15"),
            DeliveryRecord::default().with_date("2025-01-12").with_time("09:45:10"),
            DeliveryRecord::default().with_date("garbage").with_time("23:00"),
            DeliveryRecord::default().with_time("nope"),
        ];

        let weekdays = deliveries_by_weekday(&records);
        assert_eq!(weekdays[0], 1); // Monday
        assert_eq!(weekdays[6], 1); // Sunday
        assert_eq!(weekdays.iter().sum::<usize>(), 2);

        let hours = deliveries_by_hour(&records);
        assert_eq!(hours[9], 2);
        assert_eq!(hours[23], 1);
        assert_eq!(hours.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_dataset_summary() {
        let frame = df!(
            "droneId" => ["D1", "D2", "D3", "D4", "D5", "D6"],
            "deliveryPointLng" => [Some(1.0), None, Some(3.0), Some(4.0), None, Some(6.0)]
        )
        .unwrap();
        let summary = dataset_summary(&frame);

        assert_eq!(summary.rows, 6);
        assert_eq!(summary.columns, 2);
        assert_eq!(summary.column_summaries[0].name, "droneId");
        assert_eq!(summary.column_summaries[0].missing, 0);
        assert_eq!(summary.column_summaries[1].missing, 2);
        assert_eq!(summary.head.len(), SUMMARY_HEAD_ROWS);
        assert_eq!(summary.head[0]["droneId"], Value::from("D1"));
        assert_eq!(summary.head[0]["deliveryPointLng"], Value::from(1.0));
        assert_eq!(summary.head[1]["deliveryPointLng"], Value::Null);
    }

    #[test]
    fn test_dataset_summary_empty() {
        let summary = dataset_summary(&DataFrame::empty());
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.columns, 0);
        assert!(summary.head.is_empty());
    }

    #[test]
    fn test_float_to_json_non_finite() {
        assert_eq!(float_to_json(f64::NAN), Value::Null);
        assert_eq!(float_to_json(0.5), Value::from(0.5));
    }
}
