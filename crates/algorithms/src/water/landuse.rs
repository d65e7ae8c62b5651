//! Land-use polygon loader
//!
//! Reads one region's land-use/land-cover water layer, normalizes the
//! land-use code and keeps the categories a query asks for, optionally with a
//! minimum size in acres per category.

use crate::vector::acres;
use std::fs;
use std::path::{Path, PathBuf};
use streamprep_core::io::{read_features, ReadOptions};
use streamprep_core::{AttributeValue, Error, Feature, FeatureTable, Result};
use tracing::{debug, info};

/// Estuarine / marine water
pub const LU_ESTUARINE_MARINE: i64 = 1100;
/// Reservoirs
pub const LU_RESERVOIR: i64 = 1210;
/// Lotic (flowing) water
pub const LU_LOTIC_WATER: i64 = 1300;

pub const CODE_COLUMN: &str = "lu_code";
pub const ACRES_COLUMN: &str = "acres";

/// Layer holding the water polygons in each region's source
pub const DEFAULT_LAYER: &str = "water";

/// Regions with Delaware Bay or Atlantic water outside the Chesapeake
/// shoreline coverage
pub const ESTUARY_REGIONS: [&str; 7] = [
    "acco_51001",
    "kent_10001",
    "newc_10003",
    "nort_51131",
    "suss_10005",
    "virg_51810",
    "worc_24047",
];

/// Source file of a region, relative to the region directory
pub fn default_source_file() -> &'static str {
    if cfg!(feature = "gdal") {
        "input/wetlands/water.gpkg"
    } else {
        "input/wetlands/water.geojson"
    }
}

/// One accepted land-use category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRule {
    pub code: i64,
    /// Inclusive lower bound on area; `None` accepts any size
    pub min_acres: Option<f64>,
}

impl CategoryRule {
    pub fn any_size(code: i64) -> Self {
        Self { code, min_acres: None }
    }

    pub fn at_least(code: i64, min_acres: f64) -> Self {
        Self {
            code,
            min_acres: Some(min_acres),
        }
    }

    pub fn accepts(&self, acres: f64) -> bool {
        self.min_acres.map_or(true, |min| acres >= min)
    }
}

/// What to read from each region and which records to keep
#[derive(Debug, Clone)]
pub struct LandUseQuery {
    pub layer: String,
    pub source_file: PathBuf,
    pub rules: Vec<CategoryRule>,
}

impl LandUseQuery {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self {
            layer: DEFAULT_LAYER.to_string(),
            source_file: PathBuf::from(default_source_file()),
            rules,
        }
    }

    /// Lotic water of at least `threshold` acres, plus reservoirs of any size
    pub fn lotic(threshold: f64) -> Self {
        Self::new(vec![
            CategoryRule::at_least(LU_LOTIC_WATER, threshold),
            CategoryRule::any_size(LU_RESERVOIR),
        ])
    }

    /// Estuarine and marine water of any size
    pub fn estuarine() -> Self {
        Self::new(vec![CategoryRule::any_size(LU_ESTUARINE_MARINE)])
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn with_source_file(mut self, source_file: impl Into<PathBuf>) -> Self {
        self.source_file = source_file.into();
        self
    }

    pub fn source_path(&self, root: &Path, region: &str) -> PathBuf {
        root.join(region).join(&self.source_file)
    }

    fn rule_for(&self, code: i64) -> Option<&CategoryRule> {
        self.rules.iter().find(|r| r.code == code)
    }
}

/// Load and filter one region.
///
/// A region without a source file yields an empty table.
pub fn load_region(root: &Path, region: &str, query: &LandUseQuery) -> Result<FeatureTable> {
    let path = query.source_path(root, region);
    match read_features(&path, &ReadOptions::layer(query.layer.as_str())) {
        Ok(table) => filter_land_use(table, query),
        Err(Error::MissingSource(missing)) => {
            debug!("{}: no source at {}", region, missing.display());
            Ok(FeatureTable::new())
        }
        Err(e) => Err(e),
    }
}

/// Load every region in order, keeping only the non-empty tables
pub fn load_regions<S: AsRef<str>>(
    root: &Path,
    regions: &[S],
    query: &LandUseQuery,
) -> Result<Vec<FeatureTable>> {
    let mut tables = Vec::new();
    for region in regions {
        let region = region.as_ref();
        let table = load_region(root, region, query)?;
        if table.is_empty() {
            info!("{}: no records", region);
        } else {
            info!("{}: added {} records", region, table.len());
            tables.push(table);
        }
    }
    Ok(tables)
}

/// Sorted names of the region directories under `root`
pub fn list_regions(root: &Path) -> Result<Vec<String>> {
    let mut regions = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            regions.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    regions.sort();
    Ok(regions)
}

/// Keep the records of `table` matching `query`.
///
/// Output records carry `lu_code` (Int), `acres` (Float) and the geometry.
/// Every record's code is normalized first, so one malformed code fails the
/// whole table even if it belongs to a category that would be dropped.
/// Records without geometry are dropped.
pub fn filter_land_use(table: FeatureTable, query: &LandUseQuery) -> Result<FeatureTable> {
    let codes = table
        .iter()
        .enumerate()
        .map(|(index, f)| normalize_code(f.get_property(CODE_COLUMN), index))
        .collect::<Result<Vec<i64>>>()?;

    let mut out = FeatureTable::from_features(Vec::new(), table.crs().cloned());
    let mut without_geometry = 0usize;

    for (feature, code) in table.into_iter().zip(codes) {
        let Some(rule) = query.rule_for(code) else {
            continue;
        };
        let Some(geometry) = feature.geometry else {
            without_geometry += 1;
            continue;
        };

        let size = acres(&geometry);
        if !rule.accepts(size) {
            continue;
        }

        out.push(Feature {
            geometry: Some(geometry),
            properties: Default::default(),
            id: feature.id,
        }
        .with_property(CODE_COLUMN, AttributeValue::Int(code))
        .with_property(ACRES_COLUMN, AttributeValue::Float(size)));
    }

    if without_geometry > 0 {
        debug!("dropped {} matching records without geometry", without_geometry);
    }
    Ok(out)
}

/// Normalize a free-form land-use code to an integer.
///
/// Integers pass through, finite floats are truncated toward zero and strings
/// must parse as integers. Anything else is a `MalformedAttribute`.
pub fn normalize_code(value: Option<&AttributeValue>, index: usize) -> Result<i64> {
    let malformed = |shown: String| Error::MalformedAttribute {
        field: CODE_COLUMN.to_string(),
        index,
        value: shown,
    };

    match value {
        Some(AttributeValue::Int(i)) => Ok(*i),
        Some(AttributeValue::Float(f)) if f.is_finite() && f.abs() < i64::MAX as f64 => {
            Ok(f.trunc() as i64)
        }
        Some(AttributeValue::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| malformed(format!("{:?}", s))),
        Some(other) => Err(malformed(other.to_string())),
        None => Err(malformed("missing".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::ACRE_SQ_METERS;
    use geo::{Geometry, LineString, Polygon};

    /// Square polygon of the given size in acres
    fn pond(acres: f64) -> Geometry<f64> {
        let side = (acres * ACRE_SQ_METERS).sqrt();
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (side, 0.0), (side, side), (0.0, side), (0.0, 0.0)]),
            vec![],
        )
        .into()
    }

    fn coded(code: AttributeValue, acres: f64) -> Feature {
        Feature::new(pond(acres)).with_property(CODE_COLUMN, code)
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut table = FeatureTable::new();
        table.push(coded(AttributeValue::Int(LU_LOTIC_WATER), 25.0));
        table.push(coded(AttributeValue::Int(LU_LOTIC_WATER), 24.99));
        table.push(coded(AttributeValue::Int(LU_RESERVOIR), 0.5));
        table.push(coded(AttributeValue::Int(LU_ESTUARINE_MARINE), 100.0));

        // Exactly-threshold polygons land a hair either side of 25.0 after the
        // sqrt round trip; pin the threshold to the computed area instead.
        let exact = acres(&pond(25.0));
        let out = filter_land_use(table, &LandUseQuery::lotic(exact)).unwrap();

        let codes: Vec<i64> = out
            .iter()
            .map(|f| f.get_property(CODE_COLUMN).and_then(AttributeValue::as_int).unwrap())
            .collect();
        assert_eq!(codes, vec![LU_LOTIC_WATER, LU_RESERVOIR]);
        assert_eq!(out.column_names(), vec![ACRES_COLUMN, CODE_COLUMN]);
    }

    #[test]
    fn test_exempt_category_ignores_size() {
        let mut table = FeatureTable::new();
        table.push(coded(AttributeValue::Int(LU_RESERVOIR), 0.001));
        let out = filter_land_use(table, &LandUseQuery::lotic(1000.0)).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_code_normalization() {
        assert_eq!(normalize_code(Some(&AttributeValue::Int(1300)), 0).unwrap(), 1300);
        assert_eq!(normalize_code(Some(&AttributeValue::Float(1210.0)), 0).unwrap(), 1210);
        assert_eq!(normalize_code(Some(&AttributeValue::Float(1100.9)), 0).unwrap(), 1100);
        assert_eq!(
            normalize_code(Some(&AttributeValue::String(" 1300 ".to_string())), 0).unwrap(),
            1300
        );

        let bad = [
            Some(AttributeValue::String("water".to_string())),
            Some(AttributeValue::String("1300.5".to_string())),
            Some(AttributeValue::Float(f64::NAN)),
            Some(AttributeValue::Null),
            Some(AttributeValue::Bool(true)),
            None,
        ];
        for value in bad.iter() {
            assert!(matches!(
                normalize_code(value.as_ref(), 4),
                Err(Error::MalformedAttribute { index: 4, .. })
            ));
        }
    }

    #[test]
    fn test_malformed_code_fails_whole_table() {
        let mut table = FeatureTable::new();
        table.push(coded(AttributeValue::Int(LU_LOTIC_WATER), 30.0));
        table.push(coded(AttributeValue::String("n/a".to_string()), 30.0));

        let err = filter_land_use(table, &LandUseQuery::lotic(25.0)).unwrap_err();
        assert!(matches!(err, Error::MalformedAttribute { index: 1, .. }));
    }

    #[test]
    fn test_records_without_geometry_dropped() {
        let mut table = FeatureTable::new();
        table.push(Feature::empty().with_property(CODE_COLUMN, AttributeValue::Int(LU_RESERVOIR)));
        table.push(coded(AttributeValue::Int(LU_RESERVOIR), 1.0));
        let out = filter_land_use(table, &LandUseQuery::lotic(25.0)).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_missing_region_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_region(dir.path(), "nowhere_00000", &LandUseQuery::estuarine()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_list_regions_sorted_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["worc_24047", "acco_51001", "kent_10001"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let regions = list_regions(dir.path()).unwrap();
        assert_eq!(regions, vec!["acco_51001", "kent_10001", "worc_24047"]);
    }
}
