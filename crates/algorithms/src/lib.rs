//! # streamprep Algorithms
//!
//! Vector algorithms for preparing hydrological layers.
//!
//! ## Available Algorithm Categories
//!
//! - **vector**: area and length measurements, spatial predicates, chunked
//!   parallel spatial join
//! - **water**: land-use loading, merging, connectivity and network cleaning

pub mod vector;
pub mod water;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::vector::{
        acres, area, length, spatial_join, JoinParams, SpatialJoin, SpatialPredicate,
    };
    pub use crate::water::{
        clean_network, load_regions, merge_tables, remove_disconnected, write_output,
        LandUseQuery,
    };
    pub use streamprep_core::prelude::*;
}
