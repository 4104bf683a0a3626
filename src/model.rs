//! K-Means clustering of delivery coordinates

use std::str::FromStr;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::PointSet;
use crate::distance::{row_distance, Point};
use crate::error::ConfigError;

/// Iteration cap applied when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
/// Seed for initial centroid sampling.
pub const DEFAULT_SEED: u64 = 42;
/// Largest centroid coordinate shift still counted as converged.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// What to do with a cluster that receives no points in an assignment step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyClusterPolicy {
    /// Re-seed the centroid with a random point drawn from the run's seeded RNG.
    #[default]
    Resample,
    /// Re-seed the centroid with the point farthest from its assigned centroid.
    Farthest,
}

impl FromStr for EmptyClusterPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resample" => Ok(Self::Resample),
            "farthest" => Ok(Self::Farthest),
            _ => Err(ConfigError::UnknownEmptyClusterPolicy {
                name: s.to_string(),
            }),
        }
    }
}

/// Parameters for a K-Means run.
///
/// # Example
///
/// ```
/// use droneforge::{EmptyClusterPolicy, KMeansParams};
///
/// let params = KMeansParams::new()
///     .with_seed(7)
///     .with_tolerance(0.0)
///     .with_empty_cluster(EmptyClusterPolicy::Farthest);
///
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParams {
    max_iterations: usize,
    tolerance: f64,
    seed: u64,
    empty_cluster: EmptyClusterPolicy,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self::new()
    }
}

impl KMeansParams {
    /// Defaults: 1000 iterations, tolerance `1e-9`, seed 42, resample empty clusters.
    pub fn new() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            seed: DEFAULT_SEED,
            empty_cluster: EmptyClusterPolicy::Resample,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// A tolerance of `0.0` only stops on exactly repeated centroids.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_empty_cluster(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster = policy;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn empty_cluster(&self) -> EmptyClusterPolicy {
        self.empty_cluster
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations {
                max_iterations: self.max_iterations,
            });
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance {
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }
}

/// Result of one K-Means run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Number of clusters after clamping to the point count
    pub n_clusters: usize,
    /// Centroids as `[lng, lat]` rows, shape `(n_clusters, 2)`
    pub centroids: Array2<f64>,
    /// Cluster index of every point, from the last assignment step
    pub labels: Array1<usize>,
    /// Within-cluster sum of squares (inertia)
    pub inertia: f64,
    /// Number of assignment/update rounds performed
    pub iterations: usize,
    /// Whether the run stopped before the iteration cap
    pub converged: bool,
}

impl Clustering {
    /// The degenerate result for an empty point set.
    pub fn empty() -> Self {
        Self {
            n_clusters: 0,
            centroids: Array2::zeros((0, 2)),
            labels: Array1::zeros(0),
            inertia: 0.0,
            iterations: 0,
            converged: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.n_clusters == 0
    }

    pub fn centroid(&self, cluster: usize) -> Point {
        Point::from_row(self.centroids.row(cluster))
    }

    pub fn centroid_points(&self) -> Vec<Point> {
        self.centroids.outer_iter().map(Point::from_row).collect()
    }

    /// Point indices grouped by cluster. Every point appears in exactly one group.
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut clusters = vec![Vec::new(); self.n_clusters];
        for (i, &label) in self.labels.iter().enumerate() {
            clusters[label].push(i);
        }
        clusters
    }

    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            sizes[label] += 1;
        }
        sizes
    }

    /// Nearest centroid to `point`, or `None` when there are no clusters.
    pub fn predict(&self, point: &Point) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let query = ndarray::arr1(&[point.lng, point.lat]);
        Some(nearest_centroid(query.view(), &self.centroids))
    }
}

/// Cluster `points` into `k` groups with default parameters.
pub fn cluster(points: &PointSet, k: usize) -> Clustering {
    cluster_with(points, k, &KMeansParams::default())
}

/// Cluster `points` into `k` groups.
///
/// `k` is clamped to `1..=points.len()`. An empty point set yields
/// [`Clustering::empty`]. Never fails.
pub fn cluster_with(points: &PointSet, k: usize, params: &KMeansParams) -> Clustering {
    let n = points.len();
    if n == 0 {
        return Clustering::empty();
    }
    let k = k.clamp(1, n);
    let coords = points.coords();
    let max_iterations = params.max_iterations.max(1);

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut centroids = Array2::zeros((k, 2));
    for (c, idx) in rand::seq::index::sample(&mut rng, n, k).iter().enumerate() {
        centroids.row_mut(c).assign(&coords.row(idx));
    }

    let mut labels = Array1::zeros(n);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        assign(coords, &centroids, &mut labels);
        let updated = update(coords, &labels, &centroids, params.empty_cluster, &mut rng);
        let shift = max_shift(&centroids, &updated);
        centroids = updated;
        if shift <= params.tolerance {
            converged = true;
            break;
        }
    }

    let inertia = compute_inertia(coords, &labels, &centroids);
    debug!(n, k, iterations, converged, inertia, "k-means finished");

    Clustering {
        n_clusters: k,
        centroids,
        labels,
        inertia,
        iterations,
        converged,
    }
}

/// Index of the nearest centroid; ties go to the lowest index.
fn nearest_centroid(point: ndarray::ArrayView1<f64>, centroids: &Array2<f64>) -> usize {
    let mut min_distance = f64::INFINITY;
    let mut closest = 0;

    for (idx, centroid) in centroids.outer_iter().enumerate() {
        let distance = row_distance(point, centroid);
        if distance < min_distance {
            min_distance = distance;
            closest = idx;
        }
    }

    closest
}

fn assign(coords: &Array2<f64>, centroids: &Array2<f64>, labels: &mut Array1<usize>) {
    for (label, point) in labels.iter_mut().zip(coords.outer_iter()) {
        *label = nearest_centroid(point, centroids);
    }
}

fn update(
    coords: &Array2<f64>,
    labels: &Array1<usize>,
    previous: &Array2<f64>,
    policy: EmptyClusterPolicy,
    rng: &mut StdRng,
) -> Array2<f64> {
    let k = previous.nrows();
    let mut sums = Array2::<f64>::zeros((k, 2));
    let mut counts = vec![0usize; k];

    for (point, &label) in coords.outer_iter().zip(labels.iter()) {
        let mut sum = sums.row_mut(label);
        sum += &point;
        counts[label] += 1;
    }

    let mut reseeded: Vec<usize> = Vec::new();
    for c in 0..k {
        if counts[c] > 0 {
            let mut row = sums.row_mut(c);
            row /= counts[c] as f64;
            continue;
        }

        let idx = match policy {
            EmptyClusterPolicy::Resample => rng.gen_range(0..coords.nrows()),
            EmptyClusterPolicy::Farthest => farthest_point(coords, labels, previous, &reseeded),
        };
        debug!(cluster = c, point = idx, ?policy, "re-seeding empty cluster");
        reseeded.push(idx);
        sums.row_mut(c).assign(&coords.row(idx));
    }

    sums
}

/// Point farthest from its assigned centroid, skipping points already used as re-seeds.
fn farthest_point(
    coords: &Array2<f64>,
    labels: &Array1<usize>,
    centroids: &Array2<f64>,
    taken: &[usize],
) -> usize {
    let mut best = 0;
    let mut best_distance = f64::NEG_INFINITY;

    for (i, (point, &label)) in coords.outer_iter().zip(labels.iter()).enumerate() {
        if taken.contains(&i) {
            continue;
        }
        let distance = row_distance(point, centroids.row(label));
        if distance > best_distance {
            best_distance = distance;
            best = i;
        }
    }

    best
}

/// Largest absolute coordinate change between two centroid sets.
fn max_shift(old: &Array2<f64>, new: &Array2<f64>) -> f64 {
    old.iter()
        .zip(new.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(coords: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    coords
        .outer_iter()
        .zip(labels.iter())
        .map(|(point, &cluster)| row_distance(point, centroids.row(cluster)).powi(2))
        .sum()
}
