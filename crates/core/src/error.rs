//! Error types for streamprep

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for streamprep operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A source file does not exist. Loaders treat this as zero records.
    #[error("Source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Unsupported vector format: {0}")]
    UnsupportedFormat(String),

    /// No table was collected for a merge.
    #[error("Nothing to merge: no region contributed any records")]
    EmptyMergeSet,

    #[error("Invalid geometry in record {index}: {reason}")]
    InvalidGeometry { index: usize, reason: String },

    #[error("Malformed attribute '{field}' in record {index}: {value}")]
    MalformedAttribute {
        field: String,
        index: usize,
        value: String,
    },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Worker pool error: {0}")]
    ThreadPool(String),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for streamprep operations
pub type Result<T> = std::result::Result<T, Error>;
