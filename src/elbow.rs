//! Error-versus-k curve for elbow-style model selection.

use serde::Serialize;

use crate::data::PointSet;
use crate::model::{cluster_with, KMeansParams};

/// Default upper bound on k for the elbow curve.
pub const DEFAULT_MAX_K: usize = 8;

/// Within-cluster sum of squares for one cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityPoint {
    pub k: usize,
    pub sse: f64,
}

/// Run K-Means for every k in `1..=min(max_k, n)` with default parameters.
pub fn quality_curve(points: &PointSet, max_k: usize) -> Vec<QualityPoint> {
    quality_curve_with(points, max_k, &KMeansParams::default())
}

/// Run K-Means for every k in `1..=min(max_k, n)` and record each SSE.
///
/// Choosing k from the curve is left to the caller.
pub fn quality_curve_with(
    points: &PointSet,
    max_k: usize,
    params: &KMeansParams,
) -> Vec<QualityPoint> {
    let max_k = max_k.min(points.len());
    (1..=max_k)
        .map(|k| QualityPoint {
            k,
            sse: cluster_with(points, k, params).inertia,
        })
        .collect()
}
