//! droneforge: drone delivery log analysis CLI
//!
//! Loads a fresh snapshot of the delivery log for every command, then runs
//! the requested analysis and prints or renders the result.

mod logging;

use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use droneforge::cli::{
    clamp_head_rows, Cli, ClusterArgs, Command, ElbowArgs, HeadArgs, OutputArgs, PlotArgs,
    PlotKind, DEFAULT_CONFIG_PATH,
};
use droneforge::config::AnalysisConfig;
use droneforge::metrics::{self, DatasetSummary, KpiSet};
use droneforge::{
    cluster_with, kpis, map_data, quality_curve_with, service_points, viz, Clustering,
    DeliveryLog, KMeansParams, QualityPoint,
};
use tracing::info;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path, true)?,
        None => AnalysisConfig::load(Path::new(DEFAULT_CONFIG_PATH), false)?,
    };

    let input = cli
        .input
        .clone()
        .unwrap_or_else(|| config.data.input.clone());
    let log = DeliveryLog::load(&input)
        .with_context(|| format!("failed to load delivery log: {}", input.display()))?;

    match cli.command {
        Command::Summary(args) => run_summary(&log, &args),
        Command::Kpis(args) => run_kpis(&log, &args),
        Command::Cluster(args) => run_cluster(&log, &config, &args),
        Command::Elbow(args) => run_elbow(&log, &config, &args),
        Command::Plot(args) => run_plot(&log, &config, &args),
        Command::Head(args) => run_head(&log, &args),
    }
}

fn run_summary(log: &DeliveryLog, args: &OutputArgs) -> Result<()> {
    let summary = metrics::dataset_summary(log.frame());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary)?;
    }
    Ok(())
}

fn print_summary(summary: &DatasetSummary) -> Result<()> {
    println!("rows: {}", summary.rows);
    println!("columns: {}", summary.columns);
    println!("\n  Column               | Type     | Missing");
    println!("  ---------------------|----------|--------");
    for column in &summary.column_summaries {
        println!(
            "  {:20} | {:8} | {:7}",
            column.name, column.dtype, column.missing
        );
    }
    println!("\nhead:");
    for row in &summary.head {
        println!("  {}", serde_json::to_string(row)?);
    }
    Ok(())
}

fn run_kpis(log: &DeliveryLog, args: &OutputArgs) -> Result<()> {
    let kpi_set = kpis(log.records());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&kpi_set)?);
    } else {
        print_kpis(&kpi_set);
    }
    Ok(())
}

fn print_kpis(kpis: &KpiSet) {
    println!("=== Delivery KPIs ===");
    println!("Total deliveries:       {}", kpis.total_deliveries);
    println!("Unique drones:          {}", kpis.unique_drones);
    println!("Unique service points:  {}", kpis.unique_service_points);
    println!("Average distance:       {:.2}", kpis.avg_distance);
}

fn cluster_params(config: &AnalysisConfig, args: &ClusterArgs) -> Result<KMeansParams> {
    let mut params = config.kmeans_params();
    if let Some(seed) = args.seed {
        params = params.with_seed(seed);
    }
    if let Some(policy) = args.empty_cluster {
        params = params.with_empty_cluster(policy);
    }
    params.validate()?;
    Ok(params)
}

fn run_cluster(log: &DeliveryLog, config: &AnalysisConfig, args: &ClusterArgs) -> Result<()> {
    let params = cluster_params(config, args)?;
    let k = args.k.unwrap_or(config.clustering.k);

    if args.json {
        let payload = map_data(log.records(), k, &params);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let points = log.points();
    let start_time = Instant::now();
    let model = cluster_with(&points, k, &params);
    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "clustering complete"
    );

    print_cluster_statistics(&model, points.len());

    if let Some(output) = &args.output {
        let sites = service_points(log.records());
        viz::create_cluster_visualization(&points, &model, &sites, output, None)?;
        println!("\nCluster map saved to: {}", output.display());
    }
    Ok(())
}

fn print_cluster_statistics(model: &Clustering, n_points: usize) {
    println!("=== Cluster Statistics ===");
    if model.is_empty() {
        println!("No deliveries with valid coordinates; nothing to cluster.");
        return;
    }

    println!("Number of clusters: {}", model.n_clusters);
    println!("Deliveries clustered: {}", n_points);
    println!(
        "Iterations: {}{}",
        model.iterations,
        if model.converged { " (converged)" } else { " (iteration cap reached)" }
    );
    println!("Within-cluster sum of squares: {:.6}", model.inertia);

    println!("\nCluster sizes:");
    for (i, &size) in model.cluster_sizes().iter().enumerate() {
        let percentage = (size as f64 / n_points as f64) * 100.0;
        println!("  Cluster {}: {} deliveries ({:.1}%)", i, size, percentage);
    }

    println!("\nSuggested service points (centroids):");
    println!("  Cluster |  Longitude |   Latitude");
    println!("  --------|------------|-----------");
    for (i, centroid) in model.centroid_points().iter().enumerate() {
        println!("  {:7} | {:10.6} | {:10.6}", i, centroid.lng, centroid.lat);
    }
}

fn elbow_curve(log: &DeliveryLog, config: &AnalysisConfig, max_k: usize) -> Vec<QualityPoint> {
    quality_curve_with(&log.points(), max_k, &config.kmeans_params())
}

fn run_elbow(log: &DeliveryLog, config: &AnalysisConfig, args: &ElbowArgs) -> Result<()> {
    let max_k = args.max_k.unwrap_or(config.elbow.max_k);
    let curve = elbow_curve(log, config, max_k);

    println!("   k | SSE");
    println!("  ---|-------------");
    for point in &curve {
        println!("  {:2} | {:.6}", point.k, point.sse);
    }

    viz::create_elbow_chart(&curve, &args.out)?;
    println!("\nWrote elbow plot to {}", args.out.display());
    Ok(())
}

fn run_plot(log: &DeliveryLog, config: &AnalysisConfig, args: &PlotArgs) -> Result<()> {
    let out: PathBuf = args
        .out
        .clone()
        .unwrap_or_else(|| config.output.dir.join(args.name.file_name()));
    let records = log.records();

    match args.name {
        PlotKind::Elbow => {
            let curve = elbow_curve(log, config, config.elbow.max_k);
            viz::create_elbow_chart(&curve, &out)?
        }
        PlotKind::ServicePoint => viz::create_service_point_chart(records, &out)?,
        PlotKind::DroneStacked => viz::create_drone_stacked_chart(records, &out)?,
        PlotKind::DayWeek => viz::create_weekday_chart(records, &out)?,
        PlotKind::TimeOfDay => viz::create_hour_chart(records, &out)?,
        PlotKind::Scatter => viz::create_scatter_plot(&log.points(), &out)?,
        PlotKind::Clusters => {
            let points = log.points();
            let k = args.k.unwrap_or(config.clustering.k);
            let model = cluster_with(&points, k, &config.kmeans_params());
            let sites = service_points(records);
            viz::create_cluster_visualization(&points, &model, &sites, &out, None)?
        }
    }

    println!("Wrote {:?} plot to {}", args.name, out.display());
    Ok(())
}

fn run_head(log: &DeliveryLog, args: &HeadArgs) -> Result<()> {
    let rows = metrics::head_rows(log.frame(), clamp_head_rows(args.n));
    let payload = serde_json::json!({ "head": rows });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
