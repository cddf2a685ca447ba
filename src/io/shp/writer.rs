//! Buffered shapefile writer.
//!
//! Records are kept in memory until [`ShapefileWriter::write_to`] emits the
//! geometry file, its index and the attribute rows in one pass. The running
//! bounding box and byte size are maintained on every add so the headers can
//! be written first.

use std::io::{self, Seek, Write};

use encoding_rs::Encoding;

use super::header::{write_header, FileHeader, HEADER_SIZE};
use super::index::{index_length_words, write_index_entry, IndexBuilder};
use super::record::{content_length_words, record_byte_size, write_record, MultiPointLength};
use super::stream::ShpStreamWriter;
use crate::attributes::{default_attributes, AttributeError, AttributeSink, Attributes, Schema};
use crate::error::{FileKind, Result, ShapefileError};
use crate::geometry::{Geometry, MultiPoint, Part, Polygon, PolygonGeometry, Polyline};
use crate::types::{BoundingBox, Point, ShapeType};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration options for writing shapefiles.
#[derive(Debug, Clone)]
pub struct ShapefileWriterConfiguration {
    /// Encoding of text attributes.
    ///
    /// Default: UTF-8.
    pub encoding: &'static Encoding,

    /// Write a `.cpg` sidecar naming [`encoding`](Self::encoding).
    ///
    /// Default: `true`.
    pub write_code_page: bool,

    /// Content length convention for MultiPoint records.
    ///
    /// Default: [`MultiPointLength::Legacy`].
    pub multipoint_length: MultiPointLength,
}

impl Default for ShapefileWriterConfiguration {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
            write_code_page: true,
            multipoint_length: MultiPointLength::Legacy,
        }
    }
}

// ---------------------------------------------------------------------------
// ShapefileWriter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct PendingRecord {
    geometry: Geometry,
    attributes: Option<Attributes>,
}

/// Accumulates records of one shape type and writes them out together.
#[derive(Debug, Clone, Default)]
pub struct ShapefileWriter {
    shape_type: Option<ShapeType>,
    schema: Schema,
    records: Vec<PendingRecord>,
    bbox: BoundingBox,
    /// Bytes of all buffered records, record headers included
    byte_size: u64,
    config: ShapefileWriterConfiguration,
    errors: Vec<AttributeError>,
}

impl ShapefileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration options.
    pub fn with_config(mut self, config: ShapefileWriterConfiguration) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ShapefileWriterConfiguration {
        &self.config
    }

    /// Shape type of the file; Point until a record or an explicit type
    /// fixes it.
    pub fn shape_type(&self) -> ShapeType {
        self.shape_type.unwrap_or(ShapeType::Point)
    }

    /// Fix the file's shape type. Fails if a buffered record already has a
    /// different, non-Null type.
    pub fn set_shape_type(&mut self, shape_type: ShapeType) -> Result<()> {
        if let Some(found) = self
            .records
            .iter()
            .map(|r| r.geometry.shape_type())
            .find(|t| !t.fits_file(shape_type))
        {
            return Err(ShapefileError::WrongRecordType {
                expected: shape_type,
                found,
            });
        }
        self.shape_type = Some(shape_type);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn set_schema(&mut self, schema: Schema) {
        self.schema = schema;
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Union of every buffered record's box; the zero box for Null files.
    pub fn bounding_box(&self) -> BoundingBox {
        if self.shape_type() == ShapeType::Null {
            BoundingBox::zero()
        } else {
            self.bbox.or_zero()
        }
    }

    /// Validation errors of the last [`write_to`](Self::write_to)
    pub fn errors(&self) -> &[AttributeError] {
        &self.errors
    }

    /// Buffer a record and return its 1-based number.
    ///
    /// The first non-Null record fixes the shape type; Null records are
    /// accepted in files of any type.
    pub fn add(&mut self, geometry: Geometry, attributes: Option<Attributes>) -> Result<u32> {
        // rejects geometries too large for the record length field
        content_length_words(&geometry, self.config.multipoint_length)?;
        let found = geometry.shape_type();
        match self.shape_type {
            Some(expected) if !found.fits_file(expected) => {
                return Err(ShapefileError::WrongRecordType { expected, found });
            }
            None if found != ShapeType::Null => self.shape_type = Some(found),
            _ => {}
        }

        if let Some(bbox) = geometry.bounding_box() {
            self.bbox.expand_to_box(&bbox);
        }
        self.byte_size += record_byte_size(&geometry);
        self.records.push(PendingRecord { geometry, attributes });

        let record_number = self.records.len() as u32;
        tracing::trace!(record_number, shape_type = %found, "buffered record");
        Ok(record_number)
    }

    pub fn add_point(&mut self, point: Point) -> Result<u32> {
        self.add(Geometry::Point(point), None)
    }

    pub fn add_multipoint(&mut self, points: Vec<Point>) -> Result<u32> {
        self.add(MultiPoint::new(points).into(), None)
    }

    pub fn add_polyline(&mut self, parts: Vec<Part>) -> Result<u32> {
        self.add(Polyline::new(parts).into(), None)
    }

    pub fn add_polygon(&mut self, polygons: Vec<Polygon>) -> Result<u32> {
        self.add(PolygonGeometry::new(polygons).into(), None)
    }

    pub fn add_null(&mut self) -> Result<u32> {
        self.add(Geometry::Null, None)
    }

    /// Attach attributes to the most recently added record.
    pub fn set_attributes(&mut self, attributes: Attributes) -> Result<()> {
        let record = self
            .records
            .last_mut()
            .ok_or(ShapefileError::RecordNotFound(0))?;
        record.attributes = Some(attributes);
        Ok(())
    }

    fn attributes_of(record: &PendingRecord, record_number: u32) -> Attributes {
        record
            .attributes
            .clone()
            .unwrap_or_else(|| default_attributes(record_number))
    }

    /// Check the schema and every buffered row against it. All row problems
    /// are collected before failing.
    pub fn validate(&mut self) -> Result<()> {
        self.schema.check()?;
        let encoding = self.config.encoding;
        self.errors = self
            .records
            .iter()
            .enumerate()
            .flat_map(|(i, record)| {
                let number = i as u32 + 1;
                self.schema.validate(number, &Self::attributes_of(record, number), encoding)
            })
            .collect();
        if self.errors.is_empty() {
            Ok(())
        } else {
            tracing::debug!(errors = self.errors.len(), "attribute validation failed");
            Err(ShapefileError::AttributeValidationFailed(self.errors.clone()))
        }
    }

    fn length_words(bytes: u64, kind: FileKind) -> Result<u32> {
        u32::try_from(bytes / 2).map_err(|_| {
            ShapefileError::FileWriteFailed(
                kind,
                io::Error::new(io::ErrorKind::InvalidInput, "file length exceeds the format limit"),
            )
        })
    }

    /// Validate, then write the geometry file, the index and one attribute
    /// row per record. Nothing is written when validation fails.
    pub fn write_to<S, X>(&mut self, shp: S, shx: X, attributes: &mut dyn AttributeSink) -> Result<()>
    where
        S: Write + Seek,
        X: Write + Seek,
    {
        self.validate()?;

        let shape_type = self.shape_type();
        let bbox = self.bounding_box();
        let shp_words = Self::length_words(self.byte_size + HEADER_SIZE, FileKind::Shp)?;
        let shx_words = u32::try_from(index_length_words(self.records.len())).map_err(|_| {
            ShapefileError::FileWriteFailed(
                FileKind::Shx,
                io::Error::new(io::ErrorKind::InvalidInput, "too many records"),
            )
        })?;

        let mut shp = ShpStreamWriter::new(shp, FileKind::Shp);
        let mut shx = ShpStreamWriter::new(shx, FileKind::Shx);
        write_header(&mut shp, &FileHeader::new(shape_type, bbox, shp_words))?;
        write_header(&mut shx, &FileHeader::new(shape_type, bbox, shx_words))?;

        let mut index = IndexBuilder::new();
        for (i, record) in self.records.iter().enumerate() {
            let number = i as u32 + 1;
            let length = write_record(&mut shp, number, &record.geometry, self.config.multipoint_length)?;
            attributes.append_row(&Self::attributes_of(record, number))?;
            write_index_entry(&mut shx, &index.push(length))?;
        }
        attributes.finish()?;
        shp.flush()?;
        shx.flush()?;

        tracing::debug!(
            records = self.records.len(),
            %shape_type,
            file_length_words = shp_words,
            "wrote shapefile"
        );
        Ok(())
    }
}
