//! I/O operations for reading and writing vector layers
//!
//! GeoJSON is always handled natively. Every other format (GeoPackage,
//! Shapefile, ...) goes through OGR and needs the `gdal` feature.

#[cfg(feature = "gdal")]
mod gdal_io;
mod geojson_io;

pub use geojson_io::{read_geojson, read_geojson_str, to_geojson_string, write_geojson};

use crate::error::{Error, Result};
use crate::vector::{BoundingBox, FeatureTable};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Options for reading a vector layer
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Layer name for multi-layer sources; the first layer when `None`
    pub layer: Option<String>,
    /// Keep only features whose envelope intersects this box
    pub bbox: Option<BoundingBox>,
}

impl ReadOptions {
    pub fn layer(name: impl Into<String>) -> Self {
        Self {
            layer: Some(name.into()),
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: Option<BoundingBox>) -> Self {
        self.bbox = bbox;
        self
    }
}

/// On-disk vector format, decided by file extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorFormat {
    GeoJson,
    Ogr(String),
}

impl VectorFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "geojson" | "json" => VectorFormat::GeoJson,
            _ => VectorFormat::Ogr(ext),
        }
    }
}

/// Read a vector layer into a [`FeatureTable`].
///
/// Returns [`Error::MissingSource`] when `path` does not exist so callers can
/// tell an absent source apart from a broken one.
pub fn read_features<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<FeatureTable> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingSource(path.to_path_buf()));
    }

    match VectorFormat::from_path(path) {
        VectorFormat::GeoJson => read_geojson(path, options),
        #[cfg(feature = "gdal")]
        VectorFormat::Ogr(_) => gdal_io::read_ogr(path, options),
        #[cfg(not(feature = "gdal"))]
        VectorFormat::Ogr(ext) => Err(unsupported(&ext)),
    }
}

/// Write a [`FeatureTable`] to `path`, tagging it with the table's CRS.
///
/// A failed write leaves no file at `path`.
pub fn write_table<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
    let path = path.as_ref();
    match VectorFormat::from_path(path) {
        VectorFormat::GeoJson => write_geojson(table, path),
        #[cfg(feature = "gdal")]
        VectorFormat::Ogr(_) => gdal_io::write_ogr(table, path),
        #[cfg(not(feature = "gdal"))]
        VectorFormat::Ogr(ext) => Err(unsupported(&ext)),
    }
}

/// Remove a leftover file after a failed write. A file that is already gone
/// is fine.
fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!("could not remove {}: {}", path.display(), e),
    }
}

#[cfg(not(feature = "gdal"))]
fn unsupported(ext: &str) -> Error {
    Error::UnsupportedFormat(format!(
        "'.{}' needs the `gdal` feature; only GeoJSON is available natively",
        ext
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(VectorFormat::from_path(Path::new("a/b.GeoJSON")), VectorFormat::GeoJson);
        assert_eq!(
            VectorFormat::from_path(Path::new("water.gpkg")),
            VectorFormat::Ogr("gpkg".to_string())
        );
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.geojson");
        match read_features(&path, &ReadOptions::default()) {
            Err(Error::MissingSource(p)) => assert_eq!(p, path),
            other => panic!("expected MissingSource, got {:?}", other),
        }
    }

    #[test]
    fn test_discard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("left.geojson");
        std::fs::write(&path, "{}").unwrap();

        discard(&path);
        assert!(!path.exists());
        discard(&path);
    }

    #[cfg(not(feature = "gdal"))]
    #[test]
    fn test_ogr_formats_need_gdal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.shp");
        let err = write_table(&FeatureTable::new(), &path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(!path.exists());
    }
}
