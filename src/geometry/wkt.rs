//! Well-Known Text rendering of decoded geometries

use super::{MultiPoint, PolygonGeometry, Polyline};
use crate::types::Point;

/// Render a geometry as Well-Known Text
pub trait ToWkt {
    fn to_wkt(&self) -> String;
}

/// `x y, x y, ...` wrapped in parentheses
fn point_list(points: &[Point]) -> String {
    let coords: Vec<String> = points.iter().map(|p| format!("{} {}", p.x, p.y)).collect();
    format!("({})", coords.join(", "))
}

fn point_lists<'a, I>(lists: I) -> String
where
    I: IntoIterator<Item = &'a Vec<Point>>,
{
    lists
        .into_iter()
        .map(|l| point_list(l))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ToWkt for Point {
    fn to_wkt(&self) -> String {
        format!("POINT({} {})", self.x, self.y)
    }
}

impl ToWkt for MultiPoint {
    fn to_wkt(&self) -> String {
        if self.points.is_empty() {
            return "MULTIPOINT EMPTY".to_string();
        }
        format!("MULTIPOINT{}", point_list(&self.points))
    }
}

impl ToWkt for Polyline {
    fn to_wkt(&self) -> String {
        match self.parts.len() {
            0 => "LINESTRING EMPTY".to_string(),
            1 => format!("LINESTRING{}", point_lists(&self.parts)),
            _ => format!("MULTILINESTRING({})", point_lists(&self.parts)),
        }
    }
}

impl ToWkt for PolygonGeometry {
    fn to_wkt(&self) -> String {
        let polygons: Vec<String> = self
            .polygons
            .iter()
            .map(|p| format!("({})", point_lists(&p.rings)))
            .collect();
        match polygons.len() {
            0 => "POLYGON EMPTY".to_string(),
            1 => format!("POLYGON{}", polygons[0]),
            _ => format!("MULTIPOLYGON({})", polygons.join(", ")),
        }
    }
}
