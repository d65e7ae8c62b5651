//! Chunked parallel spatial join
//!
//! The left table is cut into `workers` contiguous row ranges. Each range is
//! joined against the complete right table on its own worker of a pool that
//! lives only for the call, and the per-chunk outputs are concatenated in
//! chunk order. Because every chunk sees the whole right table, the set of
//! left rows that match does not depend on the number of workers.
//!
//! Joined rows carry the left attributes, the right attributes and
//! `index_right` (the right row position). A name present on both sides is
//! renamed to `<name>_left` / `<name>_right`. Asking for the `geometry`
//! column keeps the left geometry.

use crate::vector::predicate::{validate_geometry, SpatialPredicate};
use geo::Geometry;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::{BTreeMap, HashSet};
use streamprep_core::vector::AttributeKey;
use streamprep_core::{
    Algorithm, AttributeValue, BoundingBox, Error, Feature, FeatureTable, Result,
};
use streamprep_parallel::{ChunkIterator, ParallelStrategy, ProcessingMode, RowChunk};
use tracing::{debug, info};

/// Worker count used when none is configured
pub const DEFAULT_WORKERS: usize = 6;

/// Column holding the right row position in joined output
pub const INDEX_RIGHT: &str = "index_right";

/// Pseudo-column selecting the left geometry
pub const GEOMETRY: &str = "geometry";

/// Parameters for the chunked spatial join
#[derive(Debug, Clone)]
pub struct JoinParams {
    /// Predicate evaluated as `left <op> right`
    pub predicate: SpatialPredicate,
    /// Number of chunks, and of threads in the per-call pool
    pub workers: usize,
    /// Left column holding a unique integer per row
    pub id_column: String,
    /// Joined columns to keep, in output naming
    pub columns: Vec<String>,
}

impl Default for JoinParams {
    fn default() -> Self {
        Self {
            predicate: SpatialPredicate::Intersects,
            workers: DEFAULT_WORKERS,
            id_column: "id".to_string(),
            columns: vec!["id".to_string()],
        }
    }
}

impl JoinParams {
    pub fn new(predicate: SpatialPredicate, workers: usize) -> Self {
        Self {
            predicate,
            workers,
            ..Default::default()
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }
}

/// Spatial join algorithm
#[derive(Debug, Clone, Default)]
pub struct SpatialJoin;

impl Algorithm for SpatialJoin {
    type Input = (FeatureTable, FeatureTable);
    type Output = FeatureTable;
    type Params = JoinParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SpatialJoin"
    }

    fn description(&self) -> &'static str {
        "Keep left features satisfying a spatial predicate against any right feature, in parallel row chunks"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        spatial_join(&input.0, &input.1, &params)
    }
}

/// Inner spatial join of `left` against `right`, split over `params.workers`
/// row chunks.
///
/// Every left row with at least one satisfying right row produces one output
/// row per distinct projected value set; a left row without a match produces
/// nothing. Output rows follow chunk order, then left row order, then right
/// row order.
///
/// # Errors
/// - `InvalidParameter` for zero workers, missing or duplicate left ids, or
///   an unknown output column
/// - `InvalidGeometry` if any geometry on either side is unusable; the whole
///   join fails and no rows are returned
pub fn spatial_join(
    left: &FeatureTable,
    right: &FeatureTable,
    params: &JoinParams,
) -> Result<FeatureTable> {
    if params.workers == 0 {
        return Err(Error::InvalidParameter {
            name: "workers",
            value: "0".to_string(),
            reason: "need at least one worker".to_string(),
        });
    }
    check_ids(left, &params.id_column)?;

    let schema = JoinSchema::new(left, right);
    schema.check_columns(&params.columns)?;

    let index = RightIndex::build(right)?;

    let chunks: Vec<RowChunk> = ChunkIterator::new(left.len(), params.workers).collect();
    info!(
        "{} batches of {} for {} records",
        chunks.len(),
        chunks.first().map_or(0, |c| c.len),
        left.len()
    );

    let parts = ProcessingMode::ParallelWith(params.workers).try_par_map(0..chunks.len(), |i| {
        join_chunk(&chunks[i], left, &index, &schema, params)
    })?;

    let mut joined = FeatureTable::from_features(Vec::new(), left.crs().cloned());
    for part in parts {
        joined.features.extend(part);
    }

    debug!(
        "{} join: {} of {} left records matched, {} output rows",
        params.predicate,
        distinct_left_rows(&joined, &params.columns, &schema, &params.id_column),
        left.len(),
        joined.len()
    );
    Ok(joined)
}

/// Join one chunk of left rows against the indexed right table
pub fn join_chunk(
    chunk: &RowChunk,
    left: &FeatureTable,
    index: &RightIndex<'_>,
    schema: &JoinSchema,
    params: &JoinParams,
) -> Result<Vec<Feature>> {
    let keep_geometry = params.columns.iter().any(|c| c == GEOMETRY);
    let mut seen: HashSet<(usize, Vec<AttributeKey>)> = HashSet::new();
    let mut out = Vec::new();

    for row in chunk.rows() {
        let feature = &left.features[row];
        let geom = validate_geometry(feature.geometry.as_ref(), row)?;

        for right_row in index.candidates(geom) {
            let right_feature = &index.table.features[right_row];
            let Some(right_geom) = right_feature.geometry.as_ref() else {
                continue;
            };
            if !params.predicate.evaluate(geom, right_geom) {
                continue;
            }

            let joined = schema.join(feature, right_feature, right_row);
            let projected: BTreeMap<String, AttributeValue> = params
                .columns
                .iter()
                .filter(|c| c.as_str() != GEOMETRY)
                .map(|c| {
                    let value = joined.get(c).cloned().unwrap_or(AttributeValue::Null);
                    (c.clone(), value)
                })
                .collect();

            // The left row stands in for the left geometry, so distinct left
            // rows never collapse into one.
            let key = (row, projected.values().map(AttributeValue::key).collect());
            if !seen.insert(key) {
                continue;
            }

            out.push(Feature {
                geometry: keep_geometry.then(|| geom.clone()),
                properties: projected,
                id: feature.id.clone(),
            });
        }
    }

    Ok(out)
}

/// Integer values of `column` in a joined table
pub fn column_ids(table: &FeatureTable, column: &str) -> Result<HashSet<i64>> {
    table
        .iter()
        .enumerate()
        .map(|(i, f)| {
            f.get_property(column)
                .and_then(AttributeValue::as_int)
                .ok_or_else(|| Error::InvalidParameter {
                    name: "column",
                    value: column.to_string(),
                    reason: format!("row {} has no integer value", i),
                })
        })
        .collect()
}

/// Output naming for a left/right pair of tables
#[derive(Debug, Clone)]
pub struct JoinSchema {
    collisions: HashSet<String>,
    output_columns: HashSet<String>,
}

impl JoinSchema {
    pub fn new(left: &FeatureTable, right: &FeatureTable) -> Self {
        let left_names = left.column_names();
        let right_names = right.column_names();
        let collisions: HashSet<String> = left_names
            .iter()
            .filter(|n| right_names.contains(n))
            .cloned()
            .collect();

        let mut output_columns = HashSet::new();
        for name in &left_names {
            output_columns.insert(Self::renamed(&collisions, name, "_left"));
        }
        for name in &right_names {
            output_columns.insert(Self::renamed(&collisions, name, "_right"));
        }
        output_columns.insert(INDEX_RIGHT.to_string());
        output_columns.insert(GEOMETRY.to_string());

        Self {
            collisions,
            output_columns,
        }
    }

    fn renamed(collisions: &HashSet<String>, name: &str, suffix: &str) -> String {
        if collisions.contains(name) {
            format!("{}{}", name, suffix)
        } else {
            name.to_string()
        }
    }

    /// Output name of a left column
    pub fn left_name(&self, name: &str) -> String {
        Self::renamed(&self.collisions, name, "_left")
    }

    /// Fail on requested columns no joined row can have
    pub fn check_columns(&self, columns: &[String]) -> Result<()> {
        match columns.iter().find(|c| !self.output_columns.contains(*c)) {
            Some(unknown) => Err(Error::InvalidParameter {
                name: "columns",
                value: unknown.clone(),
                reason: "not a column of the joined tables".to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Attributes of the joined row for one matching pair
    pub fn join(
        &self,
        left: &Feature,
        right: &Feature,
        right_row: usize,
    ) -> BTreeMap<String, AttributeValue> {
        let mut row = BTreeMap::new();
        for (k, v) in &left.properties {
            row.insert(Self::renamed(&self.collisions, k, "_left"), v.clone());
        }
        for (k, v) in &right.properties {
            row.insert(Self::renamed(&self.collisions, k, "_right"), v.clone());
        }
        row.insert(INDEX_RIGHT.to_string(), AttributeValue::Int(right_row as i64));
        row
    }
}

/// Envelope of one right row, as stored in the R-tree
#[derive(Debug, Clone)]
struct RightEnvelope {
    row: usize,
    env: AABB<[f64; 2]>,
}

impl RTreeObject for RightEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

/// Right table with an R-tree over its envelopes, shared read-only by all
/// workers of one join
pub struct RightIndex<'a> {
    table: &'a FeatureTable,
    tree: RTree<RightEnvelope>,
}

impl<'a> RightIndex<'a> {
    /// Validate every right geometry and bulk-load the envelope tree
    pub fn build(table: &'a FeatureTable) -> Result<Self> {
        let mut envelopes = Vec::with_capacity(table.len());
        for (row, feature) in table.iter().enumerate() {
            let geom = validate_geometry(feature.geometry.as_ref(), row)?;
            if let Some(bb) = BoundingBox::of(geom) {
                envelopes.push(RightEnvelope {
                    row,
                    env: to_aabb(&bb),
                });
            }
        }

        Ok(Self {
            table,
            tree: RTree::bulk_load(envelopes),
        })
    }

    /// Right rows whose envelope meets the envelope of `geom`, ascending
    pub fn candidates(&self, geom: &Geometry<f64>) -> Vec<usize> {
        let Some(bb) = BoundingBox::of(geom) else {
            return Vec::new();
        };
        let mut rows: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&to_aabb(&bb))
            .map(|e| e.row)
            .collect();
        rows.sort_unstable();
        rows
    }
}

fn to_aabb(bb: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bb.min_x, bb.min_y], [bb.max_x, bb.max_y])
}

fn check_ids(left: &FeatureTable, id_column: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(left.len());
    for (row, feature) in left.iter().enumerate() {
        let bad = |reason: String| Error::InvalidParameter {
            name: "id_column",
            value: id_column.to_string(),
            reason,
        };
        match feature.get_property(id_column).and_then(AttributeValue::as_int) {
            Some(id) if seen.insert(id) => {}
            Some(id) => return Err(bad(format!("duplicate id {} at row {}", id, row))),
            None => return Err(bad(format!("row {} has no integer id", row))),
        }
    }
    Ok(())
}

fn distinct_left_rows(
    joined: &FeatureTable,
    columns: &[String],
    schema: &JoinSchema,
    id_column: &str,
) -> String {
    let name = schema.left_name(id_column);
    if !columns.contains(&name) {
        return "?".to_string();
    }
    column_ids(joined, &name).map_or_else(|_| "?".to_string(), |ids| ids.len().to_string())
}
