//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::model::EmptyClusterPolicy;

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "droneforge.toml";

/// Largest row count accepted by `head`.
pub const MAX_HEAD_ROWS: usize = 1000;

/// Drone delivery log analysis: service-point suggestions, KPIs and charts
#[derive(Parser, Debug)]
#[command(name = "droneforge", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file [default: droneforge.toml, if present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the delivery log CSV (overrides [data].input)
    #[arg(short, long, global = true)]
    pub input: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print row/column counts, column types, missing values and the first rows
    Summary(OutputArgs),
    /// Print delivery KPIs
    Kpis(OutputArgs),
    /// Cluster delivery locations into suggested service points
    Cluster(ClusterArgs),
    /// Compute the SSE-versus-k curve and write the elbow chart
    Elbow(ElbowArgs),
    /// Render one chart to PNG
    Plot(PlotArgs),
    /// Print the first rows of the log as JSON
    Head(HeadArgs),
}

#[derive(clap::Args, Debug)]
pub struct OutputArgs {
    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct ClusterArgs {
    /// Number of clusters (overrides [clustering].k)
    #[arg(short = 'k', long)]
    pub k: Option<usize>,

    /// RNG seed for initial centroids (overrides [clustering].seed)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Empty-cluster handling (overrides [clustering].empty_cluster)
    #[arg(long, value_parser = parse_policy)]
    pub empty_cluster: Option<EmptyClusterPolicy>,

    /// Emit the map payload (deliveries, service points, centroids) as JSON
    #[arg(long)]
    pub json: bool,

    /// Also write a cluster map PNG to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ElbowArgs {
    /// Largest k to evaluate (overrides [elbow].max_k)
    #[arg(short = 'k', long = "max-k")]
    pub max_k: Option<usize>,

    /// Output path for the elbow chart
    #[arg(short, long, default_value = "elbow.png")]
    pub out: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct PlotArgs {
    /// Chart to render
    #[arg(value_enum)]
    pub name: PlotKind,

    /// Output path (defaults to <output dir>/<name>.png)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Number of clusters for the `clusters` chart
    #[arg(short = 'k', long)]
    pub k: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct HeadArgs {
    /// Number of rows, clamped to 1..=1000
    #[arg(short, long, default_value = "10")]
    pub n: usize,
}

/// Charts available to the `plot` subcommand.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Elbow,
    ServicePoint,
    DroneStacked,
    DayWeek,
    TimeOfDay,
    Scatter,
    Clusters,
}

impl PlotKind {
    /// Default file name for this chart.
    pub fn file_name(self) -> &'static str {
        match self {
            PlotKind::Elbow => "elbow.png",
            PlotKind::ServicePoint => "service_point.png",
            PlotKind::DroneStacked => "drone_stacked.png",
            PlotKind::DayWeek => "day_week.png",
            PlotKind::TimeOfDay => "time_of_day.png",
            PlotKind::Scatter => "scatter.png",
            PlotKind::Clusters => "clusters.png",
        }
    }
}

fn parse_policy(s: &str) -> Result<EmptyClusterPolicy, String> {
    s.parse().map_err(|e: crate::error::ConfigError| e.to_string())
}

/// Clamp a requested `head` row count to `1..=MAX_HEAD_ROWS`.
pub fn clamp_head_rows(n: usize) -> usize {
    n.clamp(1, MAX_HEAD_ROWS)
}
