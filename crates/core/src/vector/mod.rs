//! Vector data structures
//!
//! - `AttributeValue`: a single attribute cell
//! - `Feature`: geometry + attributes
//! - `FeatureTable`: an ordered collection of features sharing one CRS
//! - `BoundingBox`: axis-aligned envelope used for spatial read filters

use crate::crs::CRS;
use geo::BoundingRect;
use geo_types::{Geometry, LineString, Polygon};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Attribute value types
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Hashable form of an [`AttributeValue`].
///
/// Floats compare by bit pattern, so two cells are the same key only when
/// they hold exactly the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
}

impl AttributeValue {
    pub fn key(&self) -> AttributeKey {
        match self {
            AttributeValue::Null => AttributeKey::Null,
            AttributeValue::Bool(b) => AttributeKey::Bool(*b),
            AttributeValue::Int(i) => AttributeKey::Int(*i),
            AttributeValue::Float(f) => AttributeKey::Float(f.to_bits()),
            AttributeValue::String(s) => AttributeKey::String(s.clone()),
        }
    }

    /// The integer payload, if this is an `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The numeric payload as `f64`, if this is an `Int` or `Float`
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes, kept sorted by column name
    pub properties: BTreeMap<String, AttributeValue>,
    /// Optional feature ID from the source
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Remove an attribute, returning it
    pub fn remove_property(&mut self, key: &str) -> Option<AttributeValue> {
        self.properties.remove(key)
    }
}

/// Ordered collection of features sharing one coordinate reference system
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub features: Vec<Feature>,
    crs: Option<CRS>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            crs: None,
        }
    }

    pub fn with_crs(crs: CRS) -> Self {
        Self {
            features: Vec::new(),
            crs: Some(crs),
        }
    }

    pub fn from_features(features: Vec<Feature>, crs: Option<CRS>) -> Self {
        Self { features, crs }
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Append all features of `other`, keeping this table's CRS
    pub fn append(&mut self, other: FeatureTable) {
        self.features.extend(other.features);
    }

    /// Write the row position `0..n` into `column` as an `Int`.
    ///
    /// The identifiers are only meaningful for this table instance and are
    /// overwritten on every call.
    pub fn assign_ids(&mut self, column: &str) {
        for (i, feature) in self.features.iter_mut().enumerate() {
            feature.set_property(column, AttributeValue::Int(i as i64));
        }
    }

    /// Sorted union of all attribute names present in the table
    pub fn column_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .features
            .iter()
            .flat_map(|f| f.properties.keys())
            .collect();
        names.into_iter().cloned().collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.features
            .iter()
            .any(|f| f.properties.contains_key(column))
    }

    /// Copy of the table restricted to `columns` (geometry and CRS kept)
    pub fn select(&self, columns: &[&str]) -> FeatureTable {
        let features = self
            .features
            .iter()
            .map(|f| Feature {
                geometry: f.geometry.clone(),
                properties: columns
                    .iter()
                    .filter_map(|c| f.properties.get(*c).map(|v| (c.to_string(), v.clone())))
                    .collect(),
                id: f.id.clone(),
            })
            .collect();
        FeatureTable::from_features(features, self.crs.clone())
    }

    /// Remove `column` from every feature
    pub fn drop_column(&mut self, column: &str) {
        for feature in &mut self.features {
            feature.remove_property(column);
        }
    }

    /// Keep only features whose integer `column` value is in `ids`
    pub fn retain_ids(&mut self, column: &str, ids: &HashSet<i64>) {
        self.features.retain(|f| {
            f.get_property(column)
                .and_then(AttributeValue::as_int)
                .is_some_and(|id| ids.contains(&id))
        });
    }

    /// Total bounds of all geometries, or `None` if no feature has an extent
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .filter_map(BoundingBox::of)
            .reduce(|a, b| a.union(&b))
    }
}

impl IntoIterator for FeatureTable {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Envelope of a geometry; `None` for empty geometries
    pub fn of(geom: &Geometry<f64>) -> Option<Self> {
        geom.bounding_rect().map(|rect| BoundingBox {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        })
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Closed-interval overlap test; boxes sharing an edge intersect
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (self.min_x, self.min_y),
                (self.max_x, self.min_y),
                (self.max_x, self.max_y),
                (self.min_x, self.max_y),
                (self.min_x, self.min_y),
            ]),
            vec![],
        )
    }
}
