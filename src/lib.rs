//! droneforge: analysis of drone delivery logs
//!
//! Loads a delivery log (CSV) into an immutable snapshot, derives KPIs and
//! service-point summaries, and clusters delivery coordinates with K-Means to
//! suggest where new service points should go. An SSE-versus-k curve supports
//! the elbow method for choosing the number of clusters.

pub mod cli;
pub mod config;
pub mod data;
pub mod distance;
pub mod elbow;
pub mod error;
pub mod map;
pub mod metrics;
pub mod model;
pub mod viz;

// Re-export public items for easier access
pub use config::AnalysisConfig;
pub use data::{DeliveryLog, DeliveryRecord, PointSet};
pub use distance::Point;
pub use elbow::{quality_curve, quality_curve_with, QualityPoint};
pub use error::{ConfigError, DataError};
pub use map::{map_data, MapData};
pub use metrics::{
    dataset_summary, kpis, resolve_service_points, service_points, DatasetSummary, KpiSet,
    ServicePointResolution, ServicePointSummary,
};
pub use model::{cluster, cluster_with, Clustering, EmptyClusterPolicy, KMeansParams};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
