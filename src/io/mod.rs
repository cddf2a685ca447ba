//! I/O module for reading and writing shapefiles and their attribute tables

pub mod dbf;
pub mod shp;

pub use dbf::{DbfReader, DbfWriter};
pub use shp::{
    Shapefile, ShapefileReader, ShapefileReaderConfiguration, ShapefileWriter, ShapefileWriterConfiguration,
};
