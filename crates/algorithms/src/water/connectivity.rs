//! Removal of water polygons disconnected from the stream network

use crate::vector::{column_ids, spatial_join, JoinParams, SpatialPredicate};
use std::path::Path;
use streamprep_core::io::{read_features, ReadOptions};
use streamprep_core::{FeatureTable, Result};
use tracing::info;

/// Per-table synthetic identifier used for join bookkeeping
pub const ID_COLUMN: &str = "id";

/// Keep the polygons touching at least one line of the network at
/// `network_path`.
///
/// Only network features inside the polygons' total bounds are read.
pub fn remove_disconnected(
    polygons: FeatureTable,
    network_path: &Path,
    workers: usize,
) -> Result<FeatureTable> {
    if polygons.is_empty() {
        return Ok(polygons);
    }

    let network = read_features(
        network_path,
        &ReadOptions::default().with_bbox(polygons.bounding_box()),
    )?;
    info!("Read {} network segments inside the water extent", network.len());

    retain_connected(polygons, &network, workers)
}

/// Keep the polygons intersecting at least one feature of `network`
pub fn retain_connected(
    mut polygons: FeatureTable,
    network: &FeatureTable,
    workers: usize,
) -> Result<FeatureTable> {
    polygons.assign_ids(ID_COLUMN);

    let params = JoinParams::new(SpatialPredicate::Intersects, workers)
        .with_id_column(ID_COLUMN)
        .with_columns([ID_COLUMN]);
    let joined = spatial_join(&polygons.select(&[ID_COLUMN]), &network.select(&[]), &params)?;
    let connected = column_ids(&joined, ID_COLUMN)?;

    info!("Removing {} disconnected features", polygons.len() - connected.len());
    polygons.retain_ids(ID_COLUMN, &connected);
    polygons.drop_column(ID_COLUMN);
    Ok(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, LineString};
    use streamprep_core::{AttributeValue, BoundingBox, Feature};

    fn pond(x0: f64, y0: f64) -> Feature {
        Feature::new(BoundingBox::new(x0, y0, x0 + 10.0, y0 + 10.0).to_polygon().into())
            .with_property("lu_code", AttributeValue::Int(1300))
    }

    fn stream(coords: Vec<(f64, f64)>) -> Feature {
        Feature::new(Geometry::LineString(LineString::from(coords)))
    }

    #[test]
    fn test_disjoint_dropped_touching_kept() {
        let polygons = FeatureTable::from_features(
            vec![pond(0.0, 0.0), pond(100.0, 100.0), pond(200.0, 0.0)],
            None,
        );
        let network = FeatureTable::from_features(
            vec![
                // ends exactly on the first pond's right edge
                stream(vec![(10.0, 5.0), (50.0, 5.0)]),
                // crosses the third pond
                stream(vec![(195.0, 5.0), (215.0, 5.0)]),
            ],
            None,
        );

        let kept = retain_connected(polygons, &network, 4).unwrap();
        assert_eq!(kept.len(), 2);
        assert!(!kept.has_column(ID_COLUMN));

        let xs: Vec<f64> = kept
            .iter()
            .map(|f| BoundingBox::of(f.geometry.as_ref().unwrap()).unwrap().min_x)
            .collect();
        assert_eq!(xs, vec![0.0, 200.0]);
    }

    #[test]
    fn test_network_attributes_do_not_collide() {
        let polygons = FeatureTable::from_features(vec![pond(0.0, 0.0)], None);
        let network = FeatureTable::from_features(
            vec![stream(vec![(5.0, -5.0), (5.0, 15.0)]).with_property("id", AttributeValue::Int(99))],
            None,
        );
        let kept = retain_connected(polygons, &network, 2).unwrap();
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_empty_polygons_skip_network_read() {
        let kept = remove_disconnected(FeatureTable::new(), Path::new("/does/not/exist.geojson"), 6).unwrap();
        assert!(kept.is_empty());
    }
}
