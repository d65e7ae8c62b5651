//! Binary spatial predicates and geometry validation for joins

use geo::{CoordsIter, Geometry, Intersects, Relate};
use std::fmt;
use std::str::FromStr;
use streamprep_core::{Error, Result};

/// Binary spatial predicate evaluated as `left <op> right`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpatialPredicate {
    /// The geometries share at least one point (boundaries included)
    #[default]
    Intersects,
    /// Left lies in right: no point of left is exterior to right and their
    /// interiors meet (DE-9IM `T*F**F***`)
    Within,
    /// Right lies in left (DE-9IM `T*****FF*`)
    Contains,
}

impl SpatialPredicate {
    pub fn evaluate(&self, left: &Geometry<f64>, right: &Geometry<f64>) -> bool {
        match self {
            SpatialPredicate::Intersects => left.intersects(right),
            SpatialPredicate::Within => left.relate(right).is_within(),
            SpatialPredicate::Contains => left.relate(right).is_contains(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpatialPredicate::Intersects => "intersects",
            SpatialPredicate::Within => "within",
            SpatialPredicate::Contains => "contains",
        }
    }
}

impl fmt::Display for SpatialPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpatialPredicate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "intersects" => Ok(SpatialPredicate::Intersects),
            "within" => Ok(SpatialPredicate::Within),
            "contains" => Ok(SpatialPredicate::Contains),
            _ => Err(Error::InvalidParameter {
                name: "predicate",
                value: s.to_string(),
                reason: "use intersects, within or contains".to_string(),
            }),
        }
    }
}

/// Check that record `index` has a geometry a predicate can be evaluated on.
///
/// Rejects missing and empty geometries, degenerate lines and rings, and
/// non-finite coordinates.
pub fn validate_geometry(geom: Option<&Geometry<f64>>, index: usize) -> Result<&Geometry<f64>> {
    let invalid = |reason: &str| Error::InvalidGeometry {
        index,
        reason: reason.to_string(),
    };

    let geom = geom.ok_or_else(|| invalid("missing geometry"))?;

    if geom.coords_count() == 0 {
        return Err(invalid("empty geometry"));
    }
    if !geom.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return Err(invalid("non-finite coordinate"));
    }
    if let Some(reason) = degenerate(geom) {
        return Err(invalid(reason));
    }

    Ok(geom)
}

fn degenerate(geom: &Geometry<f64>) -> Option<&'static str> {
    const SHORT_LINE: &str = "line string with fewer than 2 points";
    const SHORT_RING: &str = "polygon ring with fewer than 4 points";

    match geom {
        Geometry::LineString(ls) if ls.0.len() < 2 => Some(SHORT_LINE),
        Geometry::MultiLineString(mls) if mls.0.iter().any(|ls| ls.0.len() < 2) => Some(SHORT_LINE),
        Geometry::Polygon(p) if p.exterior().0.len() < 4 => Some(SHORT_RING),
        Geometry::MultiPolygon(mp) if mp.0.iter().any(|p| p.exterior().0.len() < 4) => {
            Some(SHORT_RING)
        }
        Geometry::GeometryCollection(gc) => gc.0.iter().find_map(degenerate),
        _ => None,
    }
}
