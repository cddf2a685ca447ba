//! Shared test utilities for shptools integration tests.
//!
//! All test crates import this via `mod common;`.

#![allow(dead_code)]

use shptools::geometry::Ring;
use shptools::{Point, Shapefile, ShapeRecord};
use std::path::PathBuf;

// ===========================================================================
// Paths
// ===========================================================================

/// Resolve path into the `test_output/` directory, creating it if needed.
pub fn test_output_path(filename: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_output");
    let _ = std::fs::create_dir_all(&dir);
    dir.join(filename)
}

/// Fresh session over `test_output/<name>.shp`, with any earlier output of
/// the same name removed.
pub fn fresh_session(name: &str) -> Shapefile {
    let session = Shapefile::new(test_output_path(&format!("{name}.shp")));
    for path in [
        &session.paths().shp,
        &session.paths().shx,
        &session.paths().dbf,
        &session.paths().cpg,
    ] {
        let _ = std::fs::remove_file(path);
    }
    session
}

// ===========================================================================
// Geometry builders
// ===========================================================================

pub fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

/// Closed clockwise square ring
pub fn square_cw(x0: f64, y0: f64, x1: f64, y1: f64) -> Ring {
    pts(&[(x0, y0), (x0, y1), (x1, y1), (x1, y0), (x0, y0)])
}

/// Closed counter-clockwise square ring
pub fn square_ccw(x0: f64, y0: f64, x1: f64, y1: f64) -> Ring {
    let mut ring = square_cw(x0, y0, x1, y1);
    ring.reverse();
    ring
}

// ===========================================================================
// Reading helpers
// ===========================================================================

/// Read every record of the file behind `name`.
pub fn read_all(name: &str) -> Vec<ShapeRecord> {
    let mut session = Shapefile::new(test_output_path(&format!("{name}.shp")));
    let records = session
        .records()
        .expect("open for reading")
        .collect::<shptools::Result<Vec<_>>>()
        .expect("read records");
    session.close();
    records
}

/// Big-endian u32 at `offset`
pub fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

/// Little-endian u32 at `offset`
pub fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

/// Little-endian f64 at `offset`
pub fn le_f64(bytes: &[u8], offset: usize) -> f64 {
    f64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
}
