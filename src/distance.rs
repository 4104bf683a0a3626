//! Planar coordinates and Euclidean distance.
//!
//! Longitude and latitude are treated as plain Cartesian axes; no geodesic
//! correction is applied.

use ndarray::ArrayView1;
use serde::Serialize;

/// A 2-D coordinate in (longitude, latitude) order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub lng: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        euclidean(self.lng, self.lat, other.lng, other.lat)
    }

    /// Squared Euclidean distance to `other`.
    pub fn squared_distance(&self, other: &Point) -> f64 {
        let dx = self.lng - other.lng;
        let dy = self.lat - other.lat;
        dx * dx + dy * dy
    }

    /// Both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }

    pub(crate) fn from_row(row: ArrayView1<f64>) -> Self {
        Self {
            lng: row[0],
            lat: row[1],
        }
    }
}

/// Euclidean distance between `(x1, y1)` and `(x2, y2)`.
pub fn euclidean(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    (dx * dx + dy * dy).sqrt()
}

/// Euclidean distance between two rows of a coordinate matrix.
pub fn row_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
