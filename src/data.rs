//! Delivery log loading and point-set extraction using Polars

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use ndarray::Array2;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::distance::Point;
use crate::error::DataError;

/// Column holding the delivery identifier.
pub const DELIVERY_ID: &str = "deliveryId";
/// Column holding the drone identifier.
pub const DRONE_ID: &str = "droneId";
/// Column holding the service-point name.
pub const SERVICE_POINT_NAME: &str = "servicePointName";
/// Column holding the delivery longitude.
pub const DELIVERY_LNG: &str = "deliveryPointLng";
/// Column holding the delivery latitude.
pub const DELIVERY_LAT: &str = "deliveryPointLat";
/// Column holding the canonical service-point longitude (optional).
pub const SERVICE_POINT_LNG: &str = "servicePointLng";
/// Column holding the canonical service-point latitude (optional).
pub const SERVICE_POINT_LAT: &str = "servicePointLat";
/// Column holding the delivery date.
pub const DELIVERY_DATE: &str = "deliveryDate";
/// Column holding the delivery time of day.
pub const DELIVERY_TIME: &str = "deliveryTime";

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// One row of the delivery log.
///
/// Every field is optional: a column missing from the source table, an empty
/// cell, or a value that fails to parse all become `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryRecord {
    pub delivery_id: Option<String>,
    pub drone_id: Option<String>,
    pub service_point: Option<String>,
    pub delivery_lng: Option<f64>,
    pub delivery_lat: Option<f64>,
    pub service_point_lng: Option<f64>,
    pub service_point_lat: Option<f64>,
    pub delivery_date: Option<String>,
    pub delivery_time: Option<String>,
}

impl DeliveryRecord {
    /// Record with only a delivery coordinate set.
    pub fn at(lng: f64, lat: f64) -> Self {
        Self {
            delivery_lng: Some(lng),
            delivery_lat: Some(lat),
            ..Self::default()
        }
    }

    pub fn with_drone(mut self, drone_id: impl Into<String>) -> Self {
        self.drone_id = Some(drone_id.into());
        self
    }

    pub fn with_service_point(mut self, name: impl Into<String>) -> Self {
        self.service_point = Some(name.into());
        self
    }

    pub fn with_service_point_coord(mut self, lng: f64, lat: f64) -> Self {
        self.service_point_lng = Some(lng);
        self.service_point_lat = Some(lat);
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.delivery_date = Some(date.into());
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.delivery_time = Some(time.into());
        self
    }

    /// Delivery coordinate, if both components are present and finite.
    pub fn delivery_point(&self) -> Option<Point> {
        match (self.delivery_lng, self.delivery_lat) {
            (Some(lng), Some(lat)) => Some(Point::new(lng, lat)).filter(Point::is_finite),
            _ => None,
        }
    }

    /// Delivery date, or `None` when missing or unparseable.
    pub fn date(&self) -> Option<NaiveDate> {
        self.delivery_date.as_deref().and_then(parse_date)
    }

    /// Hour of day of the delivery, or `None` when missing or unparseable.
    pub fn hour(&self) -> Option<u32> {
        self.delivery_time
            .as_deref()
            .and_then(parse_time)
            .map(|t| t.hour())
    }
}

/// Parse a delivery date, accepting ISO dates, datetimes and RFC 3339 stamps.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        })
}

/// Parse a delivery time given as `HH:MM[:SS]` or embedded in a datetime.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.time())
        })
}

/// Ordered 2-D delivery coordinates extracted from a record collection.
///
/// Rows are `[lng, lat]`. Records without a valid coordinate are skipped, so
/// `source_row(i)` maps point `i` back to its record.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    coords: Array2<f64>,
    source_rows: Vec<usize>,
}

impl PointSet {
    pub fn empty() -> Self {
        Self {
            coords: Array2::zeros((0, 2)),
            source_rows: Vec::new(),
        }
    }

    /// Project records onto their delivery coordinates.
    pub fn from_records(records: &[DeliveryRecord]) -> Self {
        let (rows, points): (Vec<usize>, Vec<Point>) = records
            .iter()
            .enumerate()
            .filter_map(|(row, record)| record.delivery_point().map(|p| (row, p)))
            .unzip();

        let skipped = records.len() - points.len();
        if skipped > 0 {
            debug!(skipped, "records without a valid delivery coordinate");
        }

        Self::with_rows(&points, rows)
    }

    /// Build a point set whose indices are the positions in `points`.
    pub fn from_points(points: &[Point]) -> Self {
        Self::with_rows(points, (0..points.len()).collect())
    }

    fn with_rows(points: &[Point], source_rows: Vec<usize>) -> Self {
        let mut coords = Array2::zeros((points.len(), 2));
        for (mut row, p) in coords.outer_iter_mut().zip(points) {
            row[0] = p.lng;
            row[1] = p.lat;
        }
        Self {
            coords,
            source_rows,
        }
    }

    pub fn len(&self) -> usize {
        self.coords.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinate matrix of shape `(n, 2)`.
    pub fn coords(&self) -> &Array2<f64> {
        &self.coords
    }

    pub fn point(&self, index: usize) -> Point {
        Point::from_row(self.coords.row(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = Point> + '_ {
        self.coords.outer_iter().map(Point::from_row)
    }

    /// Index of the source record that produced point `index`.
    pub fn source_row(&self, index: usize) -> usize {
        self.source_rows[index]
    }

    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }
}

/// An immutable snapshot of one delivery log: the raw table and its typed records.
#[derive(Debug, Clone)]
pub struct DeliveryLog {
    frame: DataFrame,
    records: Vec<DeliveryRecord>,
}

impl DeliveryLog {
    /// Load a delivery log from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        let log = Self::from_frame(frame)?;
        info!(
            path = %path.display(),
            rows = log.len(),
            columns = log.frame.width(),
            "delivery log loaded"
        );
        Ok(log)
    }

    /// Wrap an already-loaded table, projecting its rows into records.
    pub fn from_frame(frame: DataFrame) -> Result<Self, DataError> {
        let records = project_records(&frame)?;
        Ok(Self { frame, records })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Delivery coordinates of every record with a valid coordinate.
    pub fn points(&self) -> PointSet {
        PointSet::from_records(&self.records)
    }
}

fn project_records(frame: &DataFrame) -> PolarsResult<Vec<DeliveryRecord>> {
    let delivery_ids = string_column(frame, DELIVERY_ID)?;
    let drone_ids = string_column(frame, DRONE_ID)?;
    let names = string_column(frame, SERVICE_POINT_NAME)?;
    let delivery_lng = float_column(frame, DELIVERY_LNG)?;
    let delivery_lat = float_column(frame, DELIVERY_LAT)?;
    let sp_lng = float_column(frame, SERVICE_POINT_LNG)?;
    let sp_lat = float_column(frame, SERVICE_POINT_LAT)?;
    let dates = string_column(frame, DELIVERY_DATE)?;
    let times = string_column(frame, DELIVERY_TIME)?;

    let records = (0..frame.height())
        .map(|i| DeliveryRecord {
            delivery_id: delivery_ids[i].clone(),
            drone_id: drone_ids[i].clone(),
            service_point: names[i].clone(),
            delivery_lng: delivery_lng[i],
            delivery_lat: delivery_lat[i],
            service_point_lng: sp_lng[i],
            service_point_lat: sp_lat[i],
            delivery_date: dates[i].clone(),
            delivery_time: times[i].clone(),
        })
        .collect();
    Ok(records)
}

/// Column values as strings; an absent column yields all `None`.
fn string_column(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let Ok(column) = frame.column(name) else {
        return Ok(vec![None; frame.height()]);
    };
    let cast = column.cast(&DataType::String)?;
    let values = cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned))
        .collect();
    Ok(values)
}

/// Column values as finite floats; unparseable cells and an absent column yield `None`.
fn float_column(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let Ok(column) = frame.column(name) else {
        return Ok(vec![None; frame.height()]);
    };
    let cast = column.cast(&DataType::Float64)?;
    let values = cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}
