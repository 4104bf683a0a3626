//! Integration tests for droneforge

use droneforge::metrics::{deliveries_by_hour, deliveries_by_weekday, deliveries_per_service_point};
use droneforge::{
    cluster, cluster_with, dataset_summary, kpis, map_data, quality_curve, resolve_service_points,
    service_points, AnalysisConfig, DeliveryLog, EmptyClusterPolicy, KMeansParams, Point,
    ServicePointResolution,
};
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str = "deliveryId,droneId,servicePointName,deliveryPointLng,deliveryPointLat,servicePointLng,servicePointLat,deliveryDate,deliveryTime";

/// Create a test CSV file with two well-separated delivery areas
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();

    // West area, served from a point with a recorded coordinate
    writeln!(file, "1,D1,West,0.0,0.0,0.5,0.5,2025-01-06,09:15").unwrap();
    writeln!(file, "2,D1,West,0.0,1.0,,,2025-01-06,09:45").unwrap();
    writeln!(file, "3,D2,West,1.0,0.0,,,2025-01-07,14:00:00").unwrap();

    // East area, no recorded service-point coordinate
    writeln!(file, "4,D3,East,10.0,10.0,,,2025-01-12,18:30").unwrap();
    writeln!(file, "5,D3,East,10.0,11.0,,,2025-01-12,18:50").unwrap();
    writeln!(file, "6,D3,East,11.0,10.0,,,2025-01-12,19:05").unwrap();

    // Missing delivery coordinate and a service point with no coordinate at all
    writeln!(file, "7,D4,Depot,,,,,,").unwrap();

    file
}

#[test]
fn test_end_to_end_pipeline() {
    let test_file = create_test_csv();
    let log = DeliveryLog::load(test_file.path()).unwrap();

    assert_eq!(log.len(), 7);

    let kpis = kpis(log.records());
    assert_eq!(kpis.total_deliveries, 7);
    assert_eq!(kpis.unique_drones, 4);
    assert_eq!(kpis.unique_service_points, 3);
    assert!(kpis.avg_distance > 0.0);

    let points = log.points();
    assert_eq!(points.len(), 6);

    let model = cluster(&points, 2);
    assert_eq!(model.n_clusters, 2);
    assert_eq!(model.labels.len(), 6);
    assert_eq!(model.centroids.shape(), &[2, 2]);

    // Each area lands in its own cluster
    let west = model.labels[0];
    let east = model.labels[3];
    assert_ne!(west, east);
    assert!(model.labels.iter().take(3).all(|&l| l == west));
    assert!(model.labels.iter().skip(3).all(|&l| l == east));

    let total: usize = model.cluster_sizes().iter().sum();
    assert_eq!(total, 6);

    let west_centroid = model.centroid(west);
    assert!((west_centroid.lng - 1.0 / 3.0).abs() < 1e-9);
    assert!((west_centroid.lat - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_prediction() {
    let test_file = create_test_csv();
    let log = DeliveryLog::load(test_file.path()).unwrap();
    let model = cluster(&log.points(), 2);

    let near_west = model.predict(&Point::new(0.2, 0.2)).unwrap();
    let near_east = model.predict(&Point::new(10.5, 10.5)).unwrap();

    assert_eq!(near_west, model.labels[0]);
    assert_eq!(near_east, model.labels[3]);
}

#[test]
fn test_clustering_is_deterministic() {
    let test_file = create_test_csv();
    let log = DeliveryLog::load(test_file.path()).unwrap();
    let points = log.points();
    let params = KMeansParams::new().with_seed(11);

    let first = cluster_with(&points, 3, &params);
    let second = cluster_with(&points, 3, &params);

    assert_eq!(first, second);
}

#[test]
fn test_model_inertia() {
    let test_file = create_test_csv();
    let log = DeliveryLog::load(test_file.path()).unwrap();
    let model = cluster(&log.points(), 2);

    // Inertia should be non-negative
    assert!(model.inertia >= 0.0);

    // Inertia should be finite
    assert!(model.inertia.is_finite());
}

#[test]
fn test_quality_curve() {
    let test_file = create_test_csv();
    let log = DeliveryLog::load(test_file.path()).unwrap();
    let curve = quality_curve(&log.points(), 10);

    // Capped at the number of valid points
    assert_eq!(curve.len(), 6);
    assert_eq!(curve[0].k, 1);
    assert_eq!(curve[5].k, 6);
    assert!(curve[5].sse.abs() < 1e-9);

    // Splitting the two areas removes most of the error
    assert!(curve[1].sse < curve[0].sse / 10.0);
}

#[test]
fn test_service_points() {
    let test_file = create_test_csv();
    let log = DeliveryLog::load(test_file.path()).unwrap();

    let resolutions = resolve_service_points(log.records());
    assert_eq!(resolutions.len(), 3);
    assert!(matches!(
        &resolutions[0],
        ServicePointResolution::Unresolved { name, deliveries: 1 } if name == "Depot"
    ));

    let sites = service_points(log.records());
    let names: Vec<&str> = sites.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["East", "West"]);

    // East falls back to the mean delivery coordinate
    assert!((sites[0].lng - 31.0 / 3.0).abs() < 1e-9);
    assert!((sites[0].lat - 31.0 / 3.0).abs() < 1e-9);

    // West uses its recorded coordinate
    assert_eq!((sites[1].lng, sites[1].lat), (0.5, 0.5));
}

#[test]
fn test_delivery_breakdowns() {
    let test_file = create_test_csv();
    let log = DeliveryLog::load(test_file.path()).unwrap();
    let records = log.records();

    assert_eq!(
        deliveries_per_service_point(records),
        vec![
            ("West".to_string(), 3),
            ("East".to_string(), 3),
            ("Depot".to_string(), 1)
        ]
    );

    // 2025-01-06 is a Monday, 2025-01-12 a Sunday
    let weekdays = deliveries_by_weekday(records);
    assert_eq!(weekdays[0], 2);
    assert_eq!(weekdays[1], 1);
    assert_eq!(weekdays[6], 3);
    assert_eq!(weekdays.iter().sum::<usize>(), 6);

    let hours = deliveries_by_hour(records);
    assert_eq!(hours[9], 2);
    assert_eq!(hours[18], 2);
    assert_eq!(hours.iter().sum::<usize>(), 6);
}

#[test]
fn test_dataset_summary() {
    let test_file = create_test_csv();
    let log = DeliveryLog::load(test_file.path()).unwrap();
    let summary = dataset_summary(log.frame());

    assert_eq!(summary.rows, 7);
    assert_eq!(summary.columns, 9);
    assert_eq!(summary.head.len(), 5);

    let sp_lng = summary
        .column_summaries
        .iter()
        .find(|c| c.name == "servicePointLng")
        .unwrap();
    assert_eq!(sp_lng.missing, 6);
}

#[test]
fn test_empty_log() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();

    let log = DeliveryLog::load(file.path()).unwrap();
    assert!(log.is_empty());

    let kpis = kpis(log.records());
    assert_eq!(kpis.total_deliveries, 0);
    assert_eq!(kpis.avg_distance, 0.0);

    let model = cluster(&log.points(), 3);
    assert!(model.is_empty());
    assert!(model.centroids.is_empty());

    assert!(quality_curve(&log.points(), 5).is_empty());
    assert!(service_points(log.records()).is_empty());

    let payload = map_data(log.records(), 3, &KMeansParams::default());
    assert!(payload.deliveries.is_empty());
}

#[test]
fn test_config_drives_clustering() {
    let config = AnalysisConfig::from_toml(
        r#"
        [clustering]
        k = 2
        seed = 3
        empty_cluster = "farthest"
        "#,
    )
    .unwrap();

    let params = config.kmeans_params();
    assert_eq!(params.empty_cluster(), EmptyClusterPolicy::Farthest);

    let test_file = create_test_csv();
    let log = DeliveryLog::load(test_file.path()).unwrap();
    let payload = map_data(log.records(), config.clustering.k, &params);

    assert_eq!(payload.centroids.len(), 2);
    assert_eq!(payload.deliveries.len(), 6);
    assert_eq!(payload.service_points.len(), 2);
}
