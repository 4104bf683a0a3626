//! Chart rendering with Plotters

use std::collections::BTreeSet;
use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use crate::data::{DeliveryRecord, PointSet};
use crate::elbow::QualityPoint;
use crate::metrics::{self, ServicePointSummary, WEEKDAY_NAMES};
use crate::model::Clustering;

/// Color palette for different clusters
const CLUSTER_COLORS: [RGBColor; 5] = [RED, BLUE, GREEN, YELLOW, MAGENTA];

fn cluster_color(index: usize) -> RGBAColor {
    match CLUSTER_COLORS.get(index) {
        Some(color) => color.to_rgba(),
        None => Palette99::pick(index).to_rgba(),
    }
}

/// Axis range covering `values` with a margin; `0..1` when there are none.
fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((max - min) * 0.05).max(1e-3);
    (min - pad)..(max + pad)
}

/// Label for a categorical axis tick placed at integer positions.
fn category_label(labels: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

/// Line chart of SSE against k.
pub fn create_elbow_chart(curve: &[QualityPoint], output_path: &Path) -> crate::Result<()> {
    let max_k = curve.iter().map(|q| q.k).max().unwrap_or(1) as f64;
    let max_sse = curve.iter().map(|q| q.sse).fold(0.0, f64::max);
    let y_max = if max_sse > 0.0 { max_sse * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(output_path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Elbow plot for k-means", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.5f64..(max_k + 0.5), 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_labels(curve.len().max(1))
        .x_label_formatter(&|x| format!("{:.0}", x))
        .x_desc("Number of clusters k")
        .y_desc("Sum of squared distances (SSE)")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(
        curve.iter().map(|q| (q.k as f64, q.sse)),
        &BLUE,
    ))?;
    chart.draw_series(
        curve
            .iter()
            .map(|q| Circle::new((q.k as f64, q.sse), 4, BLUE.filled())),
    )?;

    root.present()?;
    info!(path = %output_path.display(), "elbow chart written");
    Ok(())
}

/// Scatter plot of delivery locations.
pub fn create_scatter_plot(points: &PointSet, output_path: &Path) -> crate::Result<()> {
    let x_range = padded_range(points.iter().map(|p| p.lng));
    let y_range = padded_range(points.iter().map(|p| p.lat));

    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Delivery Locations", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|p| Circle::new((p.lng, p.lat), 3, BLUE.mix(0.6).filled())),
    )?;

    root.present()?;
    info!(path = %output_path.display(), "scatter plot written");
    Ok(())
}

/// Deliveries colored by cluster, with centroids as squares and known
/// service points as triangles.
pub fn create_cluster_visualization(
    points: &PointSet,
    model: &Clustering,
    service_points: &[ServicePointSummary],
    output_path: &Path,
    plot_title: Option<&str>,
) -> crate::Result<()> {
    let title = plot_title.unwrap_or("Suggested service points (k-means centroids)");

    let centroids = model.centroid_points();
    let x_range = padded_range(
        points
            .iter()
            .map(|p| p.lng)
            .chain(centroids.iter().map(|c| c.lng))
            .chain(service_points.iter().map(|s| s.lng)),
    );
    let y_range = padded_range(
        points
            .iter()
            .map(|p| p.lat)
            .chain(centroids.iter().map(|c| c.lat))
            .chain(service_points.iter().map(|s| s.lat)),
    );
    let half = ((x_range.end - x_range.start).min(y_range.end - y_range.start)) * 0.01;

    let root = BitMapBackend::new(output_path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(points.iter().enumerate().map(|(i, p)| {
        let color = cluster_color(model.labels.get(i).copied().unwrap_or(0));
        Circle::new((p.lng, p.lat), 3, color.filled())
    }))?;

    for (cluster_id, centroid) in centroids.iter().enumerate() {
        let color = cluster_color(cluster_id);
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [
                    (centroid.lng - half, centroid.lat - half),
                    (centroid.lng + half, centroid.lat + half),
                ],
                color.filled(),
            )))?
            .label(format!("Suggested site {}", cluster_id))
            .legend(move |(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], color.filled()));
    }

    if !service_points.is_empty() {
        chart
            .draw_series(
                service_points
                    .iter()
                    .map(|s| TriangleMarker::new((s.lng, s.lat), 7, BLACK.filled())),
            )?
            .label("Active service point")
            .legend(|(x, y)| TriangleMarker::new((x + 5, y + 5), 5, BLACK.filled()));
    }

    if !centroids.is_empty() || !service_points.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    info!(path = %output_path.display(), "cluster map written");
    Ok(())
}

/// Single-series bar chart over named categories.
pub fn create_bar_chart(
    labels: &[String],
    counts: &[usize],
    title: &str,
    x_desc: &str,
    output_path: &Path,
) -> crate::Result<()> {
    let n = labels.len().max(1);
    let max_count = counts.iter().copied().max().unwrap_or(0).max(1) as f64;

    let root = BitMapBackend::new(output_path, (900, 450)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..(max_count * 1.1))?;

    let formatter = |x: &f64| category_label(labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&formatter)
        .x_desc(x_desc)
        .y_desc("Number of deliveries")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(counts.iter().enumerate().map(|(i, &count)| {
        Rectangle::new(
            [(i as f64 - 0.4, 0.0), (i as f64 + 0.4, count as f64)],
            BLUE.filled(),
        )
    }))?;

    root.present()?;
    info!(path = %output_path.display(), title, "bar chart written");
    Ok(())
}

/// Deliveries per service point, in order of first appearance.
pub fn create_service_point_chart(records: &[DeliveryRecord], output_path: &Path) -> crate::Result<()> {
    let (labels, counts): (Vec<String>, Vec<usize>) =
        metrics::deliveries_per_service_point(records).into_iter().unzip();
    create_bar_chart(
        &labels,
        &counts,
        "Deliveries per service point",
        "Service point",
        output_path,
    )
}

/// Deliveries per weekday, Monday first.
pub fn create_weekday_chart(records: &[DeliveryRecord], output_path: &Path) -> crate::Result<()> {
    let labels: Vec<String> = WEEKDAY_NAMES.iter().map(|d| d.to_string()).collect();
    let counts = metrics::deliveries_by_weekday(records);
    create_bar_chart(
        &labels,
        &counts,
        "Deliveries per weekday",
        "Day of week",
        output_path,
    )
}

/// Deliveries per hour of day.
pub fn create_hour_chart(records: &[DeliveryRecord], output_path: &Path) -> crate::Result<()> {
    let labels: Vec<String> = (0..24).map(|h| h.to_string()).collect();
    let counts = metrics::deliveries_by_hour(records);
    create_bar_chart(
        &labels,
        &counts,
        "Deliveries per hour of day",
        "Hour of day",
        output_path,
    )
}

/// Deliveries per drone, stacked by service point.
pub fn create_drone_stacked_chart(
    records: &[DeliveryRecord],
    output_path: &Path,
) -> crate::Result<()> {
    let counts = metrics::deliveries_by_drone_and_service_point(records);
    let drones: Vec<String> = counts.keys().cloned().collect();
    let service_points: BTreeSet<&String> = counts.values().flat_map(|m| m.keys()).collect();
    let max_total = counts
        .values()
        .map(|m| m.values().sum::<usize>())
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let n = drones.len().max(1);

    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Deliveries per drone (stacked by service point)", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..(max_total * 1.1))?;

    let formatter = |x: &f64| category_label(&drones, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&formatter)
        .x_desc("Drone ID")
        .y_desc("Number of deliveries")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let mut bottoms = vec![0usize; drones.len()];
    for (series, name) in service_points.iter().enumerate() {
        let color = cluster_color(series);
        let bars: Vec<Rectangle<(f64, f64)>> = drones
            .iter()
            .enumerate()
            .map(|(i, drone)| {
                let value = counts[drone].get(*name).copied().unwrap_or(0);
                let bottom = bottoms[i];
                bottoms[i] += value;
                Rectangle::new(
                    [(i as f64 - 0.4, bottom as f64), (i as f64 + 0.4, bottoms[i] as f64)],
                    color.filled(),
                )
            })
            .collect();

        chart
            .draw_series(bars)?
            .label(name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], color.filled()));
    }

    if !service_points.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    info!(path = %output_path.display(), "stacked drone chart written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Point;
    use crate::elbow::quality_curve;
    use crate::model::cluster;
    use tempfile::tempdir;

    fn create_test_records() -> Vec<DeliveryRecord> {
        vec![
            DeliveryRecord::at(-3.19, 55.94)
                .with_drone("1")
                .with_service_point("Appleton Tower")
                .with_date("2025-01-06")
                .with_time("09:15"),
            DeliveryRecord::at(-3.18, 55.95)
                .with_drone("1")
                .with_service_point("Appleton Tower")
                .with_date("2025-01-07")
                .with_time("10:30"),
            DeliveryRecord::at(-3.17, 55.98)
                .with_drone("2")
                .with_service_point("Ocean Terminal")
                .with_date("2025-01-07")
                .with_time("14:00"),
            DeliveryRecord::at(-3.16, 55.99)
                .with_drone("2")
                .with_service_point("Ocean Terminal")
                .with_date("bad")
                .with_time("bad"),
        ]
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(std::iter::empty::<f64>()), 0.0..1.0);
        let r = padded_range([0.0, 10.0].into_iter());
        assert_eq!(r, -0.5..10.5);
        let single = padded_range(std::iter::once(2.0));
        assert!(single.start < 2.0 && single.end > 2.0);
    }

    #[test]
    fn test_category_label() {
        let labels = vec!["Mon".to_string(), "Tue".to_string()];
        assert_eq!(category_label(&labels, 1.0), "Tue");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 5.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }

    #[test]
    fn test_create_cluster_visualization() {
        let records = create_test_records();
        let points = PointSet::from_records(&records);
        let model = cluster(&points, 2);
        let service_points = metrics::service_points(&records);
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("clusters.png");

        let result =
            create_cluster_visualization(&points, &model, &service_points, &output_path, None);
        assert!(result.is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_create_elbow_chart() {
        let points = PointSet::from_points(&[
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(5.0, 5.0),
        ]);
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("elbow.png");

        let result = create_elbow_chart(&quality_curve(&points, 8), &output_path);
        assert!(result.is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_create_count_charts() {
        let records = create_test_records();
        let temp_dir = tempdir().unwrap();

        let service = temp_dir.path().join("service_point.png");
        let weekday = temp_dir.path().join("day_week.png");
        let hour = temp_dir.path().join("time_of_day.png");
        let stacked = temp_dir.path().join("drone_stacked.png");

        assert!(create_service_point_chart(&records, &service).is_ok());
        assert!(create_weekday_chart(&records, &weekday).is_ok());
        assert!(create_hour_chart(&records, &hour).is_ok());
        assert!(create_drone_stacked_chart(&records, &stacked).is_ok());
        for path in [service, weekday, hour, stacked] {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_empty_inputs_render() {
        let temp_dir = tempdir().unwrap();
        let scatter = temp_dir.path().join("scatter.png");
        let elbow = temp_dir.path().join("elbow.png");

        assert!(create_scatter_plot(&PointSet::empty(), &scatter).is_ok());
        assert!(create_elbow_chart(&[], &elbow).is_ok());
        assert!(create_drone_stacked_chart(&[], &temp_dir.path().join("s.png")).is_ok());
    }
}
