//! OGR vector reading and writing using GDAL

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::{discard, ReadOptions};
use crate::vector::{AttributeValue, Feature, FeatureTable};
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    FieldValue, LayerAccess, LayerOptions, OGRFieldType, OGRwkbGeometryType, ToGdal,
};
use gdal::{Dataset, DriverManager};
use std::collections::BTreeMap;
use std::path::Path;

/// Sidecar extensions removed together with a failed Shapefile write
const SHAPEFILE_PARTS: [&str; 6] = ["shp", "shx", "dbf", "prj", "cpg", "qix"];

/// Read one OGR layer into a FeatureTable
///
/// With `options.bbox` set, OGR's spatial filter keeps only features whose
/// envelope intersects the box.
pub fn read_ogr(path: &Path, options: &ReadOptions) -> Result<FeatureTable> {
    let dataset = Dataset::open(path)?;
    let mut layer = match &options.layer {
        Some(name) => dataset.layer_by_name(name)?,
        None => dataset.layer(0)?,
    };

    if let Some(bb) = &options.bbox {
        layer.set_spatial_filter_rect(bb.min_x, bb.min_y, bb.max_x, bb.max_y);
    }

    let crs = layer.spatial_ref().map(|srs| crs_from_srs(&srs));
    let mut table = FeatureTable::from_features(Vec::new(), crs);

    for feature in layer.features() {
        let geometry = match feature.geometry() {
            Some(g) => Some(g.to_geo()?),
            None => None,
        };

        let properties: BTreeMap<String, AttributeValue> = feature
            .fields()
            .map(|(name, value)| (name, field_to_attribute(value)))
            .collect();

        table.push(Feature {
            geometry,
            properties,
            id: feature.fid().map(|fid| fid.to_string()),
        });
    }

    Ok(table)
}

/// Write a FeatureTable through the OGR driver matching the file extension
///
/// On failure every file the driver may have created is removed again.
pub fn write_ogr(table: &FeatureTable, path: &Path) -> Result<()> {
    let result = write_layer(table, path);
    if result.is_err() {
        remove_outputs(path);
    }
    result
}

fn write_layer(table: &FeatureTable, path: &Path) -> Result<()> {
    let driver = DriverManager::get_driver_by_name(driver_name(path)?)?;
    let mut dataset = driver.create_vector_only(path)?;

    let srs = table.crs().map(srs_from_crs).transpose()?;
    let layer_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("layer")
        .to_string();

    let mut layer = dataset.create_layer(LayerOptions {
        name: &layer_name,
        srs: srs.as_ref(),
        ty: OGRwkbGeometryType::wkbUnknown,
        options: None,
    })?;

    let columns = table.column_names();
    let definitions: Vec<(&str, OGRFieldType::Type)> = columns
        .iter()
        .map(|c| (c.as_str(), field_type(table, c)))
        .collect();
    layer.create_defn_fields(&definitions)?;

    for (index, feature) in table.iter().enumerate() {
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or_else(|| Error::InvalidGeometry {
                index,
                reason: "missing geometry".to_string(),
            })?
            .to_gdal()?;

        let (names, values): (Vec<&str>, Vec<FieldValue>) = feature
            .properties
            .iter()
            .filter_map(|(k, v)| attribute_to_field(v).map(|fv| (k.as_str(), fv)))
            .unzip();

        layer.create_feature_fields(geometry, &names, &values)?;
    }

    Ok(())
}

fn driver_name(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "shp" => Ok("ESRI Shapefile"),
        "gpkg" => Ok("GPKG"),
        "fgb" => Ok("FlatGeobuf"),
        "geojson" | "json" => Ok("GeoJSON"),
        other => Err(Error::UnsupportedFormat(format!("no OGR driver for '.{}'", other))),
    }
}

/// OGR field type for a column, taken from its first non-null value
fn field_type(table: &FeatureTable, column: &str) -> OGRFieldType::Type {
    let sample = table
        .iter()
        .filter_map(|f| f.get_property(column))
        .find(|v| !v.is_null());
    match sample {
        Some(AttributeValue::Int(_)) | Some(AttributeValue::Bool(_)) => OGRFieldType::OFTInteger64,
        Some(AttributeValue::Float(_)) => OGRFieldType::OFTReal,
        _ => OGRFieldType::OFTString,
    }
}

fn field_to_attribute(value: Option<FieldValue>) -> AttributeValue {
    match value {
        None => AttributeValue::Null,
        Some(FieldValue::IntegerValue(i)) => AttributeValue::Int(i as i64),
        Some(FieldValue::Integer64Value(i)) => AttributeValue::Int(i),
        Some(FieldValue::RealValue(f)) => AttributeValue::Float(f),
        Some(FieldValue::StringValue(s)) => AttributeValue::String(s),
        Some(other) => AttributeValue::String(format!("{:?}", other)),
    }
}

fn attribute_to_field(value: &AttributeValue) -> Option<FieldValue> {
    match value {
        AttributeValue::Null => None,
        AttributeValue::Bool(b) => Some(FieldValue::Integer64Value(*b as i64)),
        AttributeValue::Int(i) => Some(FieldValue::Integer64Value(*i)),
        AttributeValue::Float(f) => Some(FieldValue::RealValue(*f)),
        AttributeValue::String(s) => Some(FieldValue::StringValue(s.clone())),
    }
}

fn crs_from_srs(srs: &SpatialRef) -> CRS {
    if let Ok(code) = srs.auth_code() {
        return CRS::from_epsg(code as u32);
    }
    match srs.to_wkt() {
        Ok(wkt) => CRS::from_wkt(wkt),
        Err(_) => CRS::from_proj(srs.to_proj4().unwrap_or_default()),
    }
}

fn srs_from_crs(crs: &CRS) -> Result<SpatialRef> {
    if let Some(code) = crs.epsg() {
        return Ok(SpatialRef::from_epsg(code)?);
    }
    if let Some(wkt) = crs.wkt() {
        return Ok(SpatialRef::from_wkt(wkt)?);
    }
    if let Some(proj) = crs.proj() {
        return Ok(SpatialRef::from_proj4(proj)?);
    }
    Err(Error::Other(format!("cannot build spatial reference for {}", crs)))
}

fn remove_outputs(path: &Path) {
    let is_shapefile = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("shp"));

    if is_shapefile {
        for ext in SHAPEFILE_PARTS {
            discard(&path.with_extension(ext));
        }
    } else {
        discard(path);
    }
}
