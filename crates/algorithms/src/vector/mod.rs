//! Vector analysis algorithms
//!
//! Geometric operations on vector features:
//! - Area / acres / length: geometric measurements
//! - Predicates: intersects, within, contains
//! - Spatial join: chunked, parallel, predicate-based inner join

mod join;
mod measurements;
mod predicate;

pub use join::{
    column_ids, join_chunk, spatial_join, JoinParams, JoinSchema, RightIndex, SpatialJoin,
    DEFAULT_WORKERS, GEOMETRY, INDEX_RIGHT,
};
pub use measurements::{acres, area, length, ACRE_SQ_METERS};
pub use predicate::{validate_geometry, SpatialPredicate};
