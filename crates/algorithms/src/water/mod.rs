//! Water layer preparation
//!
//! - Land-use loader: per-region water polygons filtered by code and size
//! - Merge / write: concatenation of region tables and output files
//! - Connectivity: drop water polygons not touching the stream network
//! - Network: drop stream segments touching no other segment

mod connectivity;
mod landuse;
mod merge;
mod network;

pub use connectivity::{remove_disconnected, retain_connected, ID_COLUMN};
pub use landuse::{
    default_source_file, filter_land_use, list_regions, load_region, load_regions,
    normalize_code, CategoryRule, LandUseQuery, ACRES_COLUMN, CODE_COLUMN, DEFAULT_LAYER,
    ESTUARY_REGIONS, LU_ESTUARINE_MARINE, LU_LOTIC_WATER, LU_RESERVOIR,
};
pub use merge::{merge_tables, write_output};
pub use network::{clean_network, remove_isolated_segments, LENGTH_COLUMN};
