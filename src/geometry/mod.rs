//! Decoded geometry model.
//!
//! Geometries are plain owned values. Every multi-point geometry carries the
//! bounding box that is written into its record, computed once at
//! construction.

mod ring;
mod wkt;

pub use ring::{flatten_rings, is_clockwise, reconstruct_polygons, shoelace_sum, SCALE_FACTORS};
pub use wkt::ToWkt;

use crate::attributes::Attributes;
use crate::error::Result;
use crate::types::{BoundingBox, Point, ShapeType};

/// An open sequence of points inside a PolyLine record
pub type Part = Vec<Point>;

/// A closed vertex loop inside a Polygon record
pub type Ring = Vec<Point>;

/// A set of unconnected points
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPoint {
    pub bbox: BoundingBox,
    pub points: Vec<Point>,
}

impl MultiPoint {
    /// Create a multipoint, computing its bounding box
    pub fn new(points: Vec<Point>) -> Self {
        MultiPoint {
            bbox: BoundingBox::from_points(&points),
            points,
        }
    }
}

/// One or more open parts
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub bbox: BoundingBox,
    pub parts: Vec<Part>,
}

impl Polyline {
    /// Create a polyline, computing its bounding box
    pub fn new(parts: Vec<Part>) -> Self {
        Polyline {
            bbox: BoundingBox::from_points(parts.iter().flatten()),
            parts,
        }
    }

    /// Total number of points across all parts
    pub fn num_points(&self) -> usize {
        self.parts.iter().map(Vec::len).sum()
    }
}

/// An outer boundary followed by zero or more holes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

impl Polygon {
    /// Create a polygon from an outer ring and its holes
    pub fn new(outer: Ring, holes: Vec<Ring>) -> Self {
        let mut rings = Vec::with_capacity(holes.len() + 1);
        rings.push(outer);
        rings.extend(holes);
        Polygon { rings }
    }

    /// The outer boundary, if any ring exists
    pub fn outer(&self) -> Option<&Ring> {
        self.rings.first()
    }

    /// Rings after the outer boundary
    pub fn holes(&self) -> &[Ring] {
        self.rings.get(1..).unwrap_or(&[])
    }
}

/// One or more polygons stored in a single Polygon record
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonGeometry {
    pub bbox: BoundingBox,
    pub polygons: Vec<Polygon>,
}

impl PolygonGeometry {
    /// Create from already-grouped polygons, computing the bounding box
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let bbox = BoundingBox::from_points(
            polygons.iter().flat_map(|p| p.rings.iter()).flatten(),
        );
        PolygonGeometry { bbox, polygons }
    }

    /// Group a flat ring list by orientation: clockwise rings open a new
    /// polygon, counter-clockwise rings are holes of the current one.
    pub fn from_rings(rings: Vec<Ring>) -> Result<Self> {
        Ok(Self::new(reconstruct_polygons(rings)?))
    }

    /// All rings in on-disk order
    pub fn rings(&self) -> impl Iterator<Item = &Ring> + Clone {
        flatten_rings(&self.polygons)
    }

    /// Number of rings across all polygons
    pub fn num_rings(&self) -> usize {
        self.polygons.iter().map(|p| p.rings.len()).sum()
    }

    /// Number of points across all rings
    pub fn num_points(&self) -> usize {
        self.rings().map(Vec::len).sum()
    }
}

/// Geometry carried by one record
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Null,
    Point(Point),
    MultiPoint(MultiPoint),
    Polyline(Polyline),
    Polygon(PolygonGeometry),
}

impl Geometry {
    /// Shape type code this geometry is encoded with
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Geometry::Null => ShapeType::Null,
            Geometry::Point(_) => ShapeType::Point,
            Geometry::MultiPoint(_) => ShapeType::MultiPoint,
            Geometry::Polyline(_) => ShapeType::PolyLine,
            Geometry::Polygon(_) => ShapeType::Polygon,
        }
    }

    /// Bounding box contributed to the file header. Null contributes nothing.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            Geometry::Null => None,
            Geometry::Point(p) => Some(BoundingBox::from_point(*p)),
            Geometry::MultiPoint(mp) => Some(mp.bbox),
            Geometry::Polyline(pl) => Some(pl.bbox),
            Geometry::Polygon(pg) => Some(pg.bbox),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Geometry::Null)
    }

    /// WKT rendering, `None` for Null
    pub fn to_wkt(&self) -> Option<String> {
        match self {
            Geometry::Null => None,
            Geometry::Point(p) => Some(p.to_wkt()),
            Geometry::MultiPoint(mp) => Some(mp.to_wkt()),
            Geometry::Polyline(pl) => Some(pl.to_wkt()),
            Geometry::Polygon(pg) => Some(pg.to_wkt()),
        }
    }
}

impl From<Point> for Geometry {
    fn from(p: Point) -> Self {
        Geometry::Point(p)
    }
}

impl From<MultiPoint> for Geometry {
    fn from(mp: MultiPoint) -> Self {
        Geometry::MultiPoint(mp)
    }
}

impl From<Polyline> for Geometry {
    fn from(pl: Polyline) -> Self {
        Geometry::Polyline(pl)
    }
}

impl From<PolygonGeometry> for Geometry {
    fn from(pg: PolygonGeometry) -> Self {
        Geometry::Polygon(pg)
    }
}

/// A decoded record: its 1-based number, geometry and attribute row
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRecord {
    pub record_number: u32,
    pub geometry: Geometry,
    pub attributes: Attributes,
}

impl ShapeRecord {
    pub fn to_wkt(&self) -> Option<String> {
        self.geometry.to_wkt()
    }
}
