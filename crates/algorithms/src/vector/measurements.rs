//! Geometric measurements: area, acres, length

use geo::{Area as GeoArea, Euclidean, Geometry, Length};

/// Square meters per acre
pub const ACRE_SQ_METERS: f64 = 4046.86;

/// Calculate the area of a geometry.
///
/// Returns unsigned area in CRS units squared. Only meaningful for a planar
/// projection in meters; non-areal geometries have zero area.
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        _ => 0.0,
    }
}

/// Area converted to acres, assuming CRS units of meters
pub fn acres(geom: &Geometry<f64>) -> f64 {
    area(geom) / ACRE_SQ_METERS
}

/// Calculate the length of a linear geometry.
///
/// Returns Euclidean length in CRS units.
pub fn length(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::LineString(ls) => ls.length::<Euclidean>(),
        Geometry::MultiLineString(mls) => mls.length::<Euclidean>(),
        Geometry::Line(l) => l.length::<Euclidean>(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, Line, LineString, MultiLineString, Polygon};

    fn square(size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (0.0, 0.0), (size, 0.0), (size, size), (0.0, size), (0.0, 0.0),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_area_square() {
        let a = area(&Geometry::Polygon(square(10.0)));
        assert!((a - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_with_hole() {
        let poly = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0),
            ]),
            vec![LineString::from(vec![
                (2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0), (2.0, 2.0),
            ])],
        );
        assert!((area(&Geometry::Polygon(poly)) - 64.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_non_polygon() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (10.0, 10.0)]));
        assert_eq!(area(&line), 0.0);
    }

    #[test]
    fn test_one_acre_square() {
        let side = ACRE_SQ_METERS.sqrt();
        let a = acres(&Geometry::Polygon(square(side)));
        assert!((a - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_line() {
        let line = Geometry::LineString(LineString::from(vec![
            (0.0, 0.0), (3.0, 4.0), (3.0, 10.0),
        ]));
        assert!((length(&line) - 11.0).abs() < 1e-10);
    }

    #[test]
    fn test_length_multiline() {
        let mls = Geometry::MultiLineString(MultiLineString::new(vec![
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0)]),
            LineString::from(vec![(0.0, 0.0), (0.0, 5.0)]),
        ]));
        assert!((length(&mls) - 15.0).abs() < 1e-10);
    }

    #[test]
    fn test_length_segment() {
        let line = Geometry::Line(Line::new(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 6.0, y: 8.0 },
        ));
        assert!((length(&line) - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_length_of_stream_reach() {
        let reach = LineString::from(vec![(0.0, 0.0), (30.0, 40.0), (30.0, 100.0), (-20.0, 100.0)]);
        let expected = reach.length::<Euclidean>();
        assert!((length(&Geometry::LineString(reach)) - expected).abs() < 1e-10);
        assert!((expected - 160.0).abs() < 1e-10);
        assert_eq!(length(&Geometry::Polygon(square(10.0))), 0.0);
    }
}
