//! Error types for loading delivery logs and reading configuration.

use std::path::PathBuf;

/// Error type for loading a delivery log from disk.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when the CSV file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that could not be found.
        path: PathBuf,
    },

    /// Wraps an error originating from polars while reading or projecting the table.
    #[error("polars error: {reason}")]
    Polars {
        /// Description of the underlying polars failure.
        reason: String,
    },
}

impl From<polars::prelude::PolarsError> for DataError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        DataError::Polars {
            reason: err.to_string(),
        }
    }
}

/// Error type for invalid analysis configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Returned when the clustering iteration cap is zero.
    #[error("max_iterations must be >= 1, got {max_iterations}")]
    InvalidMaxIterations {
        /// The invalid iteration cap.
        max_iterations: usize,
    },

    /// Returned when the convergence tolerance is negative or non-finite.
    #[error("tolerance must be finite and non-negative, got {tolerance}")]
    InvalidTolerance {
        /// The invalid tolerance.
        tolerance: f64,
    },

    /// Returned when the elbow curve upper bound is zero.
    #[error("max_k must be >= 1, got {max_k}")]
    InvalidMaxK {
        /// The invalid upper bound.
        max_k: usize,
    },

    /// Returned when the empty-cluster policy name is not recognised.
    #[error("unknown empty_cluster policy '{name}' (expected 'resample' or 'farthest')")]
    UnknownEmptyClusterPolicy {
        /// The unrecognised name.
        name: String,
    },
}
