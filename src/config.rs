//! TOML configuration for the analysis pipeline.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::elbow::DEFAULT_MAX_K;
use crate::error::ConfigError;
use crate::model::{
    EmptyClusterPolicy, KMeansParams, DEFAULT_MAX_ITERATIONS, DEFAULT_SEED, DEFAULT_TOLERANCE,
};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Input settings.
    #[serde(default)]
    pub data: DataToml,

    /// K-Means settings.
    #[serde(default)]
    pub clustering: ClusteringToml,

    /// Elbow curve settings.
    #[serde(default)]
    pub elbow: ElbowToml,

    /// Chart output settings.
    #[serde(default)]
    pub output: OutputToml,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataToml {
    #[serde(default = "default_input")]
    pub input: PathBuf,
}

impl Default for DataToml {
    fn default() -> Self {
        Self {
            input: default_input(),
        }
    }
}

fn default_input() -> PathBuf {
    PathBuf::from("delivery_logs.csv")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusteringToml {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub empty_cluster: EmptyClusterPolicy,
}

impl Default for ClusteringToml {
    fn default() -> Self {
        Self {
            k: default_k(),
            seed: default_seed(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            empty_cluster: EmptyClusterPolicy::default(),
        }
    }
}

fn default_k() -> usize {
    3
}
fn default_seed() -> u64 {
    DEFAULT_SEED
}
fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}
fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElbowToml {
    #[serde(default = "default_max_k")]
    pub max_k: usize,
}

impl Default for ElbowToml {
    fn default() -> Self {
        Self {
            max_k: default_max_k(),
        }
    }
}

fn default_max_k() -> usize {
    DEFAULT_MAX_K
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputToml {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputToml {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl AnalysisConfig {
    /// Read a config file. A missing file at the default location yields defaults.
    pub fn load(path: &Path, required: bool) -> crate::Result<Self> {
        if !path.exists() {
            if required {
                anyhow::bail!("config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }
        let toml_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml(&toml_str)
    }

    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(toml_str).context("failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.kmeans_params().validate()?;
        if self.elbow.max_k == 0 {
            return Err(ConfigError::InvalidMaxK {
                max_k: self.elbow.max_k,
            });
        }
        Ok(())
    }

    /// K-Means parameters described by the `[clustering]` section.
    pub fn kmeans_params(&self) -> KMeansParams {
        KMeansParams::new()
            .with_seed(self.clustering.seed)
            .with_max_iterations(self.clustering.max_iterations)
            .with_tolerance(self.clustering.tolerance)
            .with_empty_cluster(self.clustering.empty_cluster)
    }
}
