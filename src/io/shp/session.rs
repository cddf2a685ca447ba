//! Read/write session over one `.shp`/`.shx`/`.dbf` triple.
//!
//! A session starts [`SessionState::Unset`]. The first read opens the files
//! and commits it to reading; the first add commits it to writing. It returns
//! to `Unset` after a successful [`Shapefile::write`] or [`Shapefile::close`].
//!
//! ```rust,ignore
//! use shptools::{Point, Shapefile};
//!
//! let mut out = Shapefile::new("cities.shp");
//! out.add_point(Point::new(3.0, 4.0))?;
//! out.add_point(Point::new(15.0, 15.0))?;
//! out.write()?;
//!
//! let mut input = Shapefile::new("cities.shp");
//! while let Some(record) = input.read_record()? {
//!     println!("{:?}", record.to_wkt());
//! }
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::reader::{ShapefileReader, ShapefileReaderConfiguration};
use super::writer::{ShapefileWriter, ShapefileWriterConfiguration};
use crate::attributes::{AttributeError, Attributes, Schema};
use crate::error::{FileKind, ModeConflict, Result, ShapefileError};
use crate::geometry::{Geometry, MultiPoint, Part, Polygon, PolygonGeometry, Polyline, ShapeRecord};
use crate::io::dbf::{cpg_label, DbfWriter};
use crate::notification::NotificationCollection;
use crate::types::{BoundingBox, Point, ShapeType};

/// Paths of the files making up one shapefile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapefilePaths {
    pub shp: PathBuf,
    pub shx: PathBuf,
    pub dbf: PathBuf,
    /// Code page sidecar naming the attribute encoding
    pub cpg: PathBuf,
}

impl ShapefilePaths {
    /// Derive the sibling files by replacing the extension of `shp`.
    pub fn from_shp(shp: impl AsRef<Path>) -> Self {
        let shp = shp.as_ref();
        Self {
            shp: shp.with_extension("shp"),
            shx: shp.with_extension("shx"),
            dbf: shp.with_extension("dbf"),
            cpg: shp.with_extension("cpg"),
        }
    }
}

/// Direction a session is committed to
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Unset,
    Reading(ShapefileReader),
    Writing(ShapefileWriter),
}

/// Session over one shapefile triple
#[derive(Debug)]
pub struct Shapefile {
    paths: ShapefilePaths,
    state: SessionState,
    reader_config: ShapefileReaderConfiguration,
    writer_config: ShapefileWriterConfiguration,
    errors: Vec<AttributeError>,
}

impl Shapefile {
    /// Session over `path` and its `.shx`, `.dbf` and `.cpg` siblings.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::from_paths(ShapefilePaths::from_shp(path))
    }

    /// Session over explicitly named files. The `.cpg` sidecar sits next to
    /// the attribute table.
    pub fn with_paths(shp: impl Into<PathBuf>, shx: impl Into<PathBuf>, dbf: impl Into<PathBuf>) -> Self {
        let dbf = dbf.into();
        Self::from_paths(ShapefilePaths {
            shp: shp.into(),
            shx: shx.into(),
            cpg: dbf.with_extension("cpg"),
            dbf,
        })
    }

    pub fn from_paths(paths: ShapefilePaths) -> Self {
        Self {
            paths,
            state: SessionState::Unset,
            reader_config: ShapefileReaderConfiguration::default(),
            writer_config: ShapefileWriterConfiguration::default(),
            errors: Vec::new(),
        }
    }

    pub fn with_reader_configuration(mut self, config: ShapefileReaderConfiguration) -> Self {
        self.reader_config = config;
        self
    }

    pub fn with_writer_configuration(mut self, config: ShapefileWriterConfiguration) -> Self {
        self.writer_config = config;
        self
    }

    pub fn paths(&self) -> &ShapefilePaths {
        &self.paths
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Validation errors reported by the last [`write`](Self::write)
    pub fn errors(&self) -> &[AttributeError] {
        &self.errors
    }

    /// Diagnostics gathered while reading, if the session is reading
    pub fn notifications(&self) -> Option<&NotificationCollection> {
        match &self.state {
            SessionState::Reading(reader) => Some(reader.notifications()),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Mode transitions
    // -----------------------------------------------------------------------

    fn writer(&mut self) -> Result<&mut ShapefileWriter> {
        if let SessionState::Unset = self.state {
            tracing::debug!(path = %self.paths.shp.display(), "session opened for writing");
            self.state = SessionState::Writing(ShapefileWriter::new().with_config(self.writer_config.clone()));
        }
        match &mut self.state {
            SessionState::Writing(writer) => Ok(writer),
            _ => Err(ModeConflict::WriteWhileReading.into()),
        }
    }

    fn reader(&mut self) -> Result<&mut ShapefileReader> {
        if let SessionState::Unset = self.state {
            let reader = ShapefileReader::open(
                &self.paths.shp,
                &self.paths.dbf,
                &self.paths.cpg,
                self.reader_config.clone(),
            )?;
            self.state = SessionState::Reading(reader);
        }
        match &mut self.state {
            SessionState::Reading(reader) => Ok(reader),
            _ => Err(ModeConflict::ReadWhileWriting.into()),
        }
    }

    /// Release open files and drop buffered records.
    pub fn close(&mut self) {
        self.state = SessionState::Unset;
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    pub fn set_shape_type(&mut self, shape_type: ShapeType) -> Result<()> {
        self.writer()?.set_shape_type(shape_type)
    }

    pub fn set_schema(&mut self, schema: Schema) -> Result<()> {
        self.writer()?.set_schema(schema);
        Ok(())
    }

    fn add(&mut self, geometry: Geometry, attributes: Option<Attributes>) -> Result<u32> {
        self.writer()?.add(geometry, attributes)
    }

    pub fn add_point(&mut self, point: Point) -> Result<u32> {
        self.add(Geometry::Point(point), None)
    }

    pub fn add_point_with_attributes(&mut self, point: Point, attributes: Attributes) -> Result<u32> {
        self.add(Geometry::Point(point), Some(attributes))
    }

    pub fn add_multipoint(&mut self, points: Vec<Point>) -> Result<u32> {
        self.add(MultiPoint::new(points).into(), None)
    }

    pub fn add_multipoint_with_attributes(&mut self, points: Vec<Point>, attributes: Attributes) -> Result<u32> {
        self.add(MultiPoint::new(points).into(), Some(attributes))
    }

    pub fn add_polyline(&mut self, parts: Vec<Part>) -> Result<u32> {
        self.add(Polyline::new(parts).into(), None)
    }

    pub fn add_polyline_with_attributes(&mut self, parts: Vec<Part>, attributes: Attributes) -> Result<u32> {
        self.add(Polyline::new(parts).into(), Some(attributes))
    }

    /// Add one record holding `polygons`, each an outer ring plus holes.
    pub fn add_polygon(&mut self, polygons: Vec<Polygon>) -> Result<u32> {
        self.add(PolygonGeometry::new(polygons).into(), None)
    }

    pub fn add_polygon_with_attributes(&mut self, polygons: Vec<Polygon>, attributes: Attributes) -> Result<u32> {
        self.add(PolygonGeometry::new(polygons).into(), Some(attributes))
    }

    pub fn add_null(&mut self) -> Result<u32> {
        self.add(Geometry::Null, None)
    }

    pub fn add_null_with_attributes(&mut self, attributes: Attributes) -> Result<u32> {
        self.add(Geometry::Null, Some(attributes))
    }

    /// Attach attributes to the most recently added record.
    pub fn set_attributes(&mut self, attributes: Attributes) -> Result<()> {
        self.writer()?.set_attributes(attributes)
    }

    /// Flush every buffered record to disk and return to `Unset`.
    ///
    /// Attribute validation runs before any file is created; on failure the
    /// records stay buffered and [`errors`](Self::errors) lists every problem.
    pub fn write(&mut self) -> Result<()> {
        let paths = self.paths.clone();
        let writer = self.writer()?;

        let validation = writer.validate();
        let errors = writer.errors().to_vec();
        self.errors = errors;
        validation?;

        let SessionState::Writing(writer) = &mut self.state else {
            return Err(ModeConflict::WriteWhileReading.into());
        };
        let config = writer.config().clone();

        let shp = create(&paths.shp, FileKind::Shp)?;
        let shx = create(&paths.shx, FileKind::Shx)?;
        let dbf = create(&paths.dbf, FileKind::Dbf)?;
        let mut table = DbfWriter::new(BufWriter::new(dbf), writer.schema().clone(), config.encoding)?;
        writer.write_to(BufWriter::new(shp), BufWriter::new(shx), &mut table)?;
        drop(table);

        if config.write_code_page {
            fs::write(&paths.cpg, cpg_label(config.encoding)).map_err(ShapefileError::write(FileKind::Dbf))?;
        }

        tracing::debug!(path = %paths.shp.display(), "session flushed");
        self.state = SessionState::Unset;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Next record, opening the files on first use. `Ok(None)` at end of data.
    pub fn read_record(&mut self) -> Result<Option<ShapeRecord>> {
        self.reader()?.read_record()
    }

    /// Iterate the remaining records.
    pub fn records(&mut self) -> Result<impl Iterator<Item = Result<ShapeRecord>> + '_> {
        Ok(self.reader()?.records())
    }

    /// Shape type of the buffered records, or of the file being read.
    pub fn shape_type(&mut self) -> Result<ShapeType> {
        if let SessionState::Writing(writer) = &self.state {
            return Ok(writer.shape_type());
        }
        Ok(self.reader()?.shape_type())
    }

    /// Bounding box of the buffered records, or of the file being read.
    pub fn bounding_box(&mut self) -> Result<BoundingBox> {
        if let SessionState::Writing(writer) = &self.state {
            return Ok(writer.bounding_box());
        }
        Ok(self.reader()?.bounding_box())
    }
}

fn create(path: &Path, kind: FileKind) -> Result<File> {
    File::create(path).map_err(|source| ShapefileError::FileOpenFailed {
        kind,
        path: path.to_path_buf(),
        source,
    })
}
