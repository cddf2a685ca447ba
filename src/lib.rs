//! # shptools
//!
//! A pure Rust library for reading and writing ESRI Shapefiles.
//!
//! A shapefile is a triple of files: `.shp` holds the geometry records,
//! `.shx` indexes them and `.dbf` holds one attribute row per record.
//!
//! ## Features
//!
//! - Null, Point, MultiPoint, PolyLine and Polygon shape types
//! - Polygon holes recovered from ring orientation on read
//! - dBase III attribute tables with schema validation before anything is
//!   written
//! - Code page handling through `.cpg` sidecars and language driver ids
//! - Well-Known Text rendering of decoded geometries
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shptools::{Point, Shapefile};
//!
//! // Write three points
//! let mut out = Shapefile::new("places.shp");
//! out.add_point(Point::new(3.0, 4.0))?;
//! out.add_point(Point::new(15.0, 15.0))?;
//! out.add_point(Point::new(-25.0, 15.0))?;
//! out.write()?;
//!
//! // Read them back
//! let mut input = Shapefile::new("places.shp");
//! for record in input.records()? {
//!     let record = record?;
//!     println!("#{} {:?}", record.record_number, record.to_wkt());
//! }
//! # Ok::<(), shptools::error::ShapefileError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`Shapefile`] - session committing to reading or writing on first use
//! - [`ShapefileWriter`] / [`ShapefileReader`] - the buffered writer and
//!   sequential reader behind a session, usable over any seekable stream
//! - [`AttributeSink`] / [`AttributeSource`] - the attribute table seam,
//!   implemented by [`DbfWriter`] and [`DbfReader`]

#![allow(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attributes;
pub mod error;
pub mod geometry;
pub mod io;
pub mod notification;
pub mod types;

// Re-export commonly used types
pub use error::{Result, ShapefileError};
pub use types::{BoundingBox, Point, ShapeType};

// Re-export geometry types
pub use geometry::{Geometry, MultiPoint, Polygon, PolygonGeometry, Polyline, ShapeRecord, ToWkt};

// Re-export attribute types
pub use attributes::{
    AttributeSink, AttributeSource, AttributeValue, Attributes, FieldDescriptor, FieldKind, Schema,
};

// Re-export I/O types
pub use io::dbf::{DbfReader, DbfWriter};
pub use io::shp::{
    Shapefile, ShapefileReader, ShapefileReaderConfiguration, ShapefileWriter, ShapefileWriterConfiguration,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
