//! Ring orientation and polygon reconstruction.
//!
//! Polygon records store a flat list of rings with no grouping field. By
//! convention outer boundaries wind clockwise and holes counter-clockwise, so
//! the grouping is recovered from the orientation of each ring in file order.

use super::{Polygon, Ring};
use crate::error::{Result, ShapefileError};
use crate::types::Point;

/// Scale factors tried in turn when the shoelace sum cancels to exactly zero.
pub const SCALE_FACTORS: [f64; 4] = [1.0, 1_000.0, 1_000_000.0, 1_000_000_000.0];

/// Shoelace sum `Σ (x_i·y_{i+1} − y_i·x_{i+1})` including the wraparound pair,
/// with every coordinate multiplied by `scale`.
pub fn shoelace_sum(points: &[Point], scale: f64) -> f64 {
    let Some(last) = points.last() else {
        return 0.0;
    };
    let wrap = last.scaled(scale).cross(&points[0].scaled(scale));
    points
        .windows(2)
        .map(|w| w[0].scaled(scale).cross(&w[1].scaled(scale)))
        .sum::<f64>()
        + wrap
}

/// Check whether a ring winds clockwise.
///
/// Rings with fewer than two points count as clockwise. A zero sum is
/// retried at each of [`SCALE_FACTORS`]; if it stays zero the orientation is
/// undecidable.
pub fn is_clockwise(points: &[Point]) -> Result<bool> {
    if points.len() < 2 {
        return Ok(true);
    }
    for scale in SCALE_FACTORS {
        let sum = shoelace_sum(points, scale);
        if sum != 0.0 {
            return Ok(sum < 0.0);
        }
    }
    Err(ShapefileError::PolygonAreaTooSmall)
}

/// Regroup a flat ring sequence into polygons with holes.
///
/// A clockwise ring starts a new polygon; each following counter-clockwise
/// ring becomes a hole of the current polygon. A counter-clockwise ring with
/// no polygon open yet is promoted to an outer boundary.
pub fn reconstruct_polygons(rings: Vec<Ring>) -> Result<Vec<Polygon>> {
    let mut polygons: Vec<Polygon> = Vec::new();
    for ring in rings {
        let clockwise = is_clockwise(&ring)?;
        match polygons.last_mut() {
            Some(current) if !clockwise => current.rings.push(ring),
            _ => polygons.push(Polygon { rings: vec![ring] }),
        }
    }
    Ok(polygons)
}

/// Rings of every polygon concatenated in order, as they are written to disk.
pub fn flatten_rings(polygons: &[Polygon]) -> impl Iterator<Item = &Ring> + Clone {
    polygons.iter().flat_map(|p| p.rings.iter())
}
