//! Native GeoJSON reading/writing (without GDAL dependency)
//!
//! Uses the `geojson` crate. The CRS travels in the legacy top-level `crs`
//! member (`{"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::5070"}}`),
//! which is what OGR writes and reads for projected GeoJSON.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::{discard, ReadOptions};
use crate::vector::{AttributeValue, BoundingBox, Feature, FeatureTable};
use geo_types::Geometry;
use geojson::feature::Id;
use geojson::{GeoJson, JsonObject, JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a GeoJSON file into a FeatureTable
///
/// `options.layer` is ignored: a GeoJSON document holds a single layer.
pub fn read_geojson<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<FeatureTable> {
    let text = fs::read_to_string(path.as_ref())?;
    read_geojson_str(&text, options)
}

/// Parse a GeoJSON document (FeatureCollection, Feature or bare Geometry)
pub fn read_geojson_str(text: &str, options: &ReadOptions) -> Result<FeatureTable> {
    let doc: GeoJson = text.parse()?;

    let (features, crs) = match doc {
        GeoJson::FeatureCollection(fc) => {
            let crs = fc.foreign_members.as_ref().and_then(crs_from_member);
            (fc.features, crs)
        }
        GeoJson::Feature(f) => (vec![f], None),
        GeoJson::Geometry(g) => (
            vec![geojson::Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            None,
        ),
    };

    let mut table = FeatureTable::from_features(Vec::with_capacity(features.len()), crs);
    for f in features {
        let feature = convert_feature(f)?;
        if let Some(bbox) = &options.bbox {
            let hit = feature
                .geometry
                .as_ref()
                .and_then(BoundingBox::of)
                .is_some_and(|env| env.intersects(bbox));
            if !hit {
                continue;
            }
        }
        table.push(feature);
    }

    Ok(table)
}

/// Write a FeatureTable as a GeoJSON FeatureCollection.
///
/// The document is written to a hidden `.partial` sibling first and renamed
/// into place, so `path` only ever holds a complete file.
pub fn write_geojson<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let text = to_geojson_string(table)?;

    let partial = partial_path(path);
    if let Err(e) = fs::write(&partial, text).and_then(|_| fs::rename(&partial, path)) {
        discard(&partial);
        return Err(Error::Io(e));
    }
    Ok(())
}

/// Serialize a FeatureTable to a GeoJSON FeatureCollection string
pub fn to_geojson_string(table: &FeatureTable) -> Result<String> {
    let features = table
        .iter()
        .map(|f| {
            let properties: JsonObject = f
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), attribute_to_json(v)))
                .collect();
            geojson::Feature {
                bbox: None,
                geometry: f
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: f.id.clone().map(Id::String),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let fc = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: table.crs().map(crs_to_member),
    };

    Ok(serde_json::to_string(&fc)?)
}

fn convert_feature(f: geojson::Feature) -> Result<Feature> {
    let geometry = f.geometry.map(Geometry::<f64>::try_from).transpose()?;

    let properties: BTreeMap<String, AttributeValue> = f
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, json_to_attribute(v)))
        .collect();

    let id = f.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(Feature { geometry, properties, id })
}

fn json_to_attribute(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n
                .as_f64()
                .map_or(AttributeValue::Null, AttributeValue::Float),
        },
        JsonValue::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        // NaN and infinities have no JSON form
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map_or(JsonValue::Null, JsonValue::Number),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

fn crs_from_member(members: &JsonObject) -> Option<CRS> {
    members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?
        .parse()
        .ok()
}

fn crs_to_member(crs: &CRS) -> JsonObject {
    let name = match crs.epsg() {
        Some(code) => format!("urn:ogc:def:crs:EPSG::{}", code),
        None => crs
            .proj()
            .or_else(|| crs.wkt())
            .unwrap_or_default()
            .to_string(),
    };

    let mut members = JsonObject::new();
    members.insert(
        "crs".to_string(),
        serde_json::json!({ "type": "name", "properties": { "name": name } }),
    );
    members
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    const TWO_PONDS: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::5070" } },
        "features": [
            { "type": "Feature", "id": 7,
              "properties": { "lu_code": "1300", "depth": 1.5, "tags": [1, 2] },
              "geometry": { "type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]] } },
            { "type": "Feature",
              "properties": { "lu_code": 1210, "depth": null },
              "geometry": { "type": "Polygon", "coordinates": [[[100,100],[110,100],[110,110],[100,110],[100,100]]] } },
            { "type": "Feature", "properties": { "lu_code": 1100 }, "geometry": null }
        ]
    }"#;

    #[test]
    fn test_read_collection_attributes_and_crs() {
        let table = read_geojson_str(TWO_PONDS, &ReadOptions::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.crs(), Some(&CRS::albers_conus()));

        let first = &table.features[0];
        assert_eq!(first.id.as_deref(), Some("7"));
        assert_eq!(
            first.get_property("lu_code"),
            Some(&AttributeValue::String("1300".to_string()))
        );
        assert_eq!(first.get_property("depth"), Some(&AttributeValue::Float(1.5)));
        assert_eq!(
            first.get_property("tags"),
            Some(&AttributeValue::String("[1,2]".to_string()))
        );

        let second = &table.features[1];
        assert_eq!(second.get_property("lu_code"), Some(&AttributeValue::Int(1210)));
        assert_eq!(second.get_property("depth"), Some(&AttributeValue::Null));
        assert!(table.features[2].geometry.is_none());
    }

    #[test]
    fn test_bbox_filter_drops_outside_and_empty() {
        let options = ReadOptions::default().with_bbox(Some(BoundingBox::new(-1.0, -1.0, 5.0, 5.0)));
        let table = read_geojson_str(TWO_PONDS, &options).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.features[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_bare_geometry_document() {
        let text = r#"{ "type": "LineString", "coordinates": [[0,0],[1,1]] }"#;
        let table = read_geojson_str(text, &ReadOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.crs().is_none());
        assert!(matches!(table.features[0].geometry, Some(Geometry::LineString(_))));
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");

        let mut table = FeatureTable::with_crs(CRS::albers_conus());
        let square = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (0.0, 3.0), (0.0, 0.0)]),
            vec![],
        );
        table.push(
            Feature::new(square.into())
                .with_property("lu_code", AttributeValue::Int(1300))
                .with_property("acres", AttributeValue::Float(f64::NAN)),
        );

        write_geojson(&table, &path).unwrap();
        assert!(path.exists());
        assert!(!partial_path(&path).exists());

        let back = read_geojson(&path, &ReadOptions::default()).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.crs(), Some(&CRS::albers_conus()));
        assert_eq!(back.features[0].get_property("lu_code"), Some(&AttributeValue::Int(1300)));
        assert_eq!(back.features[0].get_property("acres"), Some(&AttributeValue::Null));
    }

    #[test]
    fn test_write_into_missing_directory_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.geojson");
        assert!(write_geojson(&FeatureTable::new(), &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_rename_removes_partial() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file
        let path = dir.path().join("out.geojson");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        assert!(write_geojson(&FeatureTable::new(), &path).is_err());
        assert!(path.is_dir());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_invalid_document() {
        let err = read_geojson_str("{ not json", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::GeoJson(_)));
    }
}
