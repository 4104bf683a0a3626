//! Map payload: deliveries, known service points and suggested new ones.

use serde::Serialize;

use crate::data::{DeliveryRecord, PointSet};
use crate::distance::Point;
use crate::metrics::{service_points, ServicePointSummary};
use crate::model::{cluster_with, KMeansParams};

/// One delivery marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDelivery {
    pub lng: f64,
    pub lat: f64,
    pub service_point: Option<String>,
    pub drone_id: Option<String>,
    /// Suggested service point (centroid index) serving this delivery
    pub cluster: usize,
}

/// Everything a map view needs for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapData {
    pub deliveries: Vec<MapDelivery>,
    pub service_points: Vec<ServicePointSummary>,
    /// K-Means centroids, i.e. suggested service-point placements
    pub centroids: Vec<Point>,
}

/// Build the map payload, clustering deliveries into `k` suggested sites.
///
/// Records without a valid delivery coordinate are left off the map.
pub fn map_data(records: &[DeliveryRecord], k: usize, params: &KMeansParams) -> MapData {
    let points = PointSet::from_records(records);
    let model = cluster_with(&points, k, params);

    let deliveries = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let record = &records[points.source_row(i)];
            MapDelivery {
                lng: p.lng,
                lat: p.lat,
                service_point: record.service_point.clone(),
                drone_id: record.drone_id.clone(),
                cluster: model.labels[i],
            }
        })
        .collect();

    MapData {
        deliveries,
        service_points: service_points(records),
        centroids: model.centroid_points(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_data() {
        let records = vec![
            DeliveryRecord::at(0.0, 0.0).with_service_point("West").with_drone("1"),
            DeliveryRecord::default().with_service_point("West"),
            DeliveryRecord::at(0.0, 1.0).with_service_point("West").with_drone("1"),
            DeliveryRecord::at(10.0, 10.0).with_service_point("East").with_drone("2"),
            DeliveryRecord::at(10.0, 11.0).with_service_point("East").with_drone("2"),
        ];
        let data = map_data(&records, 2, &KMeansParams::default());

        assert_eq!(data.deliveries.len(), 4);
        assert_eq!(data.centroids.len(), 2);
        assert_eq!(data.service_points.len(), 2);
        assert_eq!(data.deliveries[1].lat, 1.0);
        assert_eq!(data.deliveries[1].drone_id.as_deref(), Some("1"));
        assert_eq!(data.deliveries[0].cluster, data.deliveries[1].cluster);
        assert_ne!(data.deliveries[0].cluster, data.deliveries[2].cluster);
    }

    #[test]
    fn test_map_data_empty() {
        let data = map_data(&[], 3, &KMeansParams::default());
        assert!(data.deliveries.is_empty());
        assert!(data.centroids.is_empty());
        assert!(data.service_points.is_empty());
    }

    #[test]
    fn test_map_data_serializes() {
        let records = vec![DeliveryRecord::at(1.0, 2.0)];
        let json = serde_json::to_value(map_data(&records, 3, &KMeansParams::default())).unwrap();
        assert_eq!(json["centroids"][0]["lng"], 1.0);
        assert_eq!(json["deliveries"][0]["cluster"], 0);
    }
}
