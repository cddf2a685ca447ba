//! Bounding box tracker for records and whole files

use super::Point;
use std::fmt;

/// Axis-aligned 2D bounding box.
///
/// A fresh tracker starts inverted at `(+inf, +inf, -inf, -inf)` so the first
/// contribution sets every bound. Contributions only ever widen the box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    /// Create a bounding box from explicit bounds
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        BoundingBox { xmin, ymin, xmax, ymax }
    }

    /// Inverted box that any contribution will overwrite
    pub const fn empty() -> Self {
        BoundingBox::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)
    }

    /// The all-zero box used by Null-typed files
    pub const fn zero() -> Self {
        BoundingBox::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Create a bounding box from a single point
    pub fn from_point(point: Point) -> Self {
        BoundingBox::new(point.x, point.y, point.x, point.y)
    }

    /// Create a bounding box that contains all given points
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut bbox = BoundingBox::empty();
        for point in points {
            bbox.expand_to_include(*point);
        }
        bbox
    }

    /// True until the first contribution arrives
    pub fn is_empty(&self) -> bool {
        self.xmin > self.xmax || self.ymin > self.ymax
    }

    /// Get the width of the bounding box
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Get the height of the bounding box
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Check if this bounding box contains a point
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.xmin && point.x <= self.xmax && point.y >= self.ymin && point.y <= self.ymax
    }

    /// Widen the box to include a point
    pub fn expand_to_include(&mut self, point: Point) {
        self.xmin = self.xmin.min(point.x);
        self.ymin = self.ymin.min(point.y);
        self.xmax = self.xmax.max(point.x);
        self.ymax = self.ymax.max(point.y);
    }

    /// Widen the box to include another box. Empty boxes contribute nothing.
    pub fn expand_to_box(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.xmin = self.xmin.min(other.xmin);
        self.ymin = self.ymin.min(other.ymin);
        self.xmax = self.xmax.max(other.xmax);
        self.ymax = self.ymax.max(other.ymax);
    }

    /// Merge with another bounding box
    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        let mut merged = *self;
        merged.expand_to_box(other);
        merged
    }

    /// The box as it should be written to disk: an empty tracker becomes zero.
    pub fn or_zero(&self) -> BoundingBox {
        if self.is_empty() {
            BoundingBox::zero()
        } else {
            *self
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox[({}, {}) -> ({}, {})]", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}
