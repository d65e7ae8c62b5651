//! Stream network cleaning: drop segments touching no other segment

use crate::vector::{length, spatial_join, JoinParams, SpatialPredicate};
use crate::water::connectivity::ID_COLUMN;
use std::collections::HashSet;
use std::path::Path;
use streamprep_core::io::{read_features, ReadOptions};
use streamprep_core::{AttributeValue, FeatureTable, Result, CRS};
use tracing::info;

/// Segment length in CRS units
pub const LENGTH_COLUMN: &str = "len";

/// Read the whole network at `path` and remove its isolated segments.
///
/// A network without a CRS is tagged as EPSG:5070.
pub fn clean_network(path: &Path, workers: usize) -> Result<FeatureTable> {
    let mut network = read_features(path, &ReadOptions::default())?;
    if network.crs().is_none() {
        network.set_crs(Some(CRS::albers_conus()));
    }
    info!("Read {} stream segments", network.len());
    remove_isolated_segments(network, workers)
}

/// Keep the segments that intersect at least one other segment.
///
/// Surviving segments carry `id` (their position in the input) and `len`.
pub fn remove_isolated_segments(mut network: FeatureTable, workers: usize) -> Result<FeatureTable> {
    network.assign_ids(ID_COLUMN);
    for feature in &mut network.features {
        let len = feature.geometry.as_ref().map_or(0.0, length);
        feature.set_property(LENGTH_COLUMN, AttributeValue::Float(len));
    }

    let id_left = format!("{}_left", ID_COLUMN);
    let id_right = format!("{}_right", ID_COLUMN);

    let segments = network.select(&[ID_COLUMN]);
    let params = JoinParams::new(SpatialPredicate::Intersects, workers)
        .with_id_column(ID_COLUMN)
        .with_columns([id_left.as_str(), id_right.as_str()]);
    let pairs = spatial_join(&segments, &segments, &params)?;

    // Every segment intersects itself; only other segments count.
    let touching: HashSet<i64> = pairs
        .iter()
        .filter_map(|f| {
            let left = f.get_property(&id_left).and_then(AttributeValue::as_int)?;
            let right = f.get_property(&id_right).and_then(AttributeValue::as_int)?;
            (left != right).then_some(left)
        })
        .collect();

    info!(
        "Removing {} records from {} stream segments...",
        network.len() - touching.len(),
        network.len()
    );
    network.retain_ids(ID_COLUMN, &touching);
    Ok(network)
}
