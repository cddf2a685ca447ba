//! Sequential shapefile reader.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;

use encoding_rs::Encoding;

use super::header::{read_header, FileHeader, FILE_CODE, HEADER_SIZE, VERSION};
use super::record::read_record;
use super::stream::ShpStreamReader;
use crate::attributes::{AttributeSource, Attributes};
use crate::error::{FileKind, Result, ShapefileError};
use crate::geometry::ShapeRecord;
use crate::io::dbf::{encoding_from_cpg, DbfReader};
use crate::notification::{NotificationCollection, NotificationType};
use crate::types::{BoundingBox, ShapeType};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration options for reading shapefiles.
#[derive(Debug, Clone)]
pub struct ShapefileReaderConfiguration {
    /// When `true`, a wrong file code is an [`ShapefileError::InvalidHeader`]
    /// error. When `false` it is reported as a warning notification.
    ///
    /// Default: `true`.
    pub strict_header: bool,

    /// Encoding of text attributes, overriding the `.cpg` sidecar and the
    /// table's language driver.
    ///
    /// Default: `None`.
    pub encoding: Option<&'static Encoding>,
}

impl Default for ShapefileReaderConfiguration {
    fn default() -> Self {
        Self {
            strict_header: true,
            encoding: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ShapefileReader
// ---------------------------------------------------------------------------

/// Byte source the reader can own behind a box
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Reads records in file order, joining each with its attribute row.
pub struct ShapefileReader {
    shp: ShpStreamReader<Box<dyn ReadSeek>>,
    attributes: Option<Box<dyn AttributeSource>>,
    header: FileHeader,
    /// Actual byte size of the geometry stream; end of data is detected
    /// against it rather than the declared length.
    file_size: u64,
    records_read: u32,
    notifications: NotificationCollection,
}

impl std::fmt::Debug for ShapefileReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapefileReader")
            .field("header", &self.header)
            .field("file_size", &self.file_size)
            .field("records_read", &self.records_read)
            .field("has_attributes", &self.attributes.is_some())
            .finish()
    }
}

impl ShapefileReader {
    /// Open a geometry file and its attribute table.
    ///
    /// The encoding of text attributes is taken from the configuration, else
    /// from `cpg` when that file exists, else from the table itself.
    pub fn open(
        shp: &Path,
        dbf: &Path,
        cpg: &Path,
        config: ShapefileReaderConfiguration,
    ) -> Result<Self> {
        let shp_file = File::open(shp).map_err(|source| ShapefileError::FileOpenFailed {
            kind: FileKind::Shp,
            path: shp.to_path_buf(),
            source,
        })?;
        let dbf_file = File::open(dbf).map_err(|source| ShapefileError::FileOpenFailed {
            kind: FileKind::Dbf,
            path: dbf.to_path_buf(),
            source,
        })?;

        let mut notifications = NotificationCollection::new();
        let encoding = match config.encoding {
            Some(encoding) => Some(encoding),
            None => Self::read_code_page(cpg, &mut notifications)?,
        };

        let table = DbfReader::from_reader(BufReader::new(dbf_file), encoding)?;
        tracing::debug!(path = %shp.display(), "opened shapefile");

        let mut reader = Self::from_readers_with_config(BufReader::new(shp_file), Some(Box::new(table)), config)?;
        notifications.append(&mut reader.notifications);
        reader.notifications = notifications;
        Ok(reader)
    }

    fn read_code_page(
        cpg: &Path,
        notifications: &mut NotificationCollection,
    ) -> Result<Option<&'static Encoding>> {
        let label = match fs::read_to_string(cpg) {
            Ok(label) => label,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ShapefileError::FileReadFailed(FileKind::Dbf, e)),
        };
        let encoding = encoding_from_cpg(&label);
        if encoding.is_none() {
            notifications.notify(
                NotificationType::Warning,
                format!("Unknown code page \"{}\" in {}", label.trim(), cpg.display()),
            );
        }
        Ok(encoding)
    }

    /// Read from in-memory or otherwise already opened sources with the
    /// default configuration.
    pub fn from_readers<R: Read + Seek + 'static>(
        shp: R,
        attributes: Option<Box<dyn AttributeSource>>,
    ) -> Result<Self> {
        Self::from_readers_with_config(shp, attributes, ShapefileReaderConfiguration::default())
    }

    pub fn from_readers_with_config<R: Read + Seek + 'static>(
        shp: R,
        attributes: Option<Box<dyn AttributeSource>>,
        config: ShapefileReaderConfiguration,
    ) -> Result<Self> {
        let mut shp = ShpStreamReader::new(Box::new(shp) as Box<dyn ReadSeek>, FileKind::Shp)?;
        let file_size = shp.stream_len()?;
        if file_size < HEADER_SIZE {
            return Err(ShapefileError::InvalidHeader(format!(
                "file is {file_size} bytes, shorter than the {HEADER_SIZE} byte header"
            )));
        }

        let header = read_header(&mut shp)?;
        let mut notifications = NotificationCollection::new();
        Self::check_header(&header, file_size, &config, &mut notifications)?;

        Ok(Self {
            shp,
            attributes,
            header,
            file_size,
            records_read: 0,
            notifications,
        })
    }

    fn check_header(
        header: &FileHeader,
        file_size: u64,
        config: &ShapefileReaderConfiguration,
        notifications: &mut NotificationCollection,
    ) -> Result<()> {
        if header.file_code != FILE_CODE {
            let message = format!("File code {} is not {FILE_CODE}", header.file_code);
            if config.strict_header {
                return Err(ShapefileError::InvalidHeader(message));
            }
            notifications.notify(NotificationType::Warning, message);
        }
        if header.version != VERSION {
            notifications.notify(
                NotificationType::Warning,
                format!("Version {} is not {VERSION}", header.version),
            );
        }
        if header.file_length_bytes() != file_size {
            notifications.notify(
                NotificationType::Warning,
                format!(
                    "Header declares {} bytes but the file holds {file_size}",
                    header.file_length_bytes()
                ),
            );
        }
        Ok(())
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn shape_type(&self) -> ShapeType {
        self.header.shape_type
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.header.bbox
    }

    pub fn notifications(&self) -> &NotificationCollection {
        &self.notifications
    }

    /// Decode the next record. `Ok(None)` once the geometry stream is
    /// exhausted.
    pub fn read_record(&mut self) -> Result<Option<ShapeRecord>> {
        if self.shp.position() >= self.file_size {
            return Ok(None);
        }
        let Some(raw) = read_record(&mut self.shp, self.header.shape_type)? else {
            return Ok(None);
        };

        self.records_read += 1;
        if raw.record_number != self.records_read {
            self.notifications.notify(
                NotificationType::Warning,
                format!(
                    "Record {} found where record {} was expected",
                    raw.record_number, self.records_read
                ),
            );
        }

        let attributes = match self.attributes.as_mut() {
            Some(source) => {
                let row = source.row_at(raw.record_number)?;
                source.drain_notifications(&mut self.notifications);
                row
            }
            None => Attributes::new(),
        };

        Ok(Some(ShapeRecord {
            record_number: raw.record_number,
            geometry: raw.geometry,
            attributes,
        }))
    }

    /// Iterate the remaining records. Iteration stops after the first error.
    pub fn records(&mut self) -> impl Iterator<Item = Result<ShapeRecord>> + '_ {
        let mut failed = false;
        std::iter::from_fn(move || {
            if failed {
                return None;
            }
            let next = self.read_record().transpose();
            failed = matches!(next, Some(Err(_)));
            next
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;
    use crate::geometry::Geometry;
    use crate::io::shp::writer::ShapefileWriter;
    use crate::types::Point;
    use std::io::Cursor;

    struct NoRows;

    impl crate::attributes::AttributeSink for NoRows {
        fn append_row(&mut self, _: &Attributes) -> Result<()> {
            Ok(())
        }
        fn finish(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Serves `{id: n}` for every row
    struct Numbered;

    impl AttributeSource for Numbered {
        fn row_at(&mut self, record_number: u32) -> Result<Attributes> {
            Ok(crate::attributes::default_attributes(record_number))
        }
    }

    fn points_file() -> Vec<u8> {
        let mut w = ShapefileWriter::new();
        for (x, y) in [(3.0, 4.0), (15.0, 15.0), (-25.0, 15.0)] {
            w.add_point(Point::new(x, y)).unwrap();
        }
        let mut shp = Cursor::new(Vec::new());
        w.write_to(&mut shp, Cursor::new(Vec::new()), &mut NoRows).unwrap();
        shp.into_inner()
    }

    #[test]
    fn test_reads_records_in_order() {
        let mut reader = ShapefileReader::from_readers(Cursor::new(points_file()), Some(Box::new(Numbered))).unwrap();
        assert_eq!(reader.shape_type(), ShapeType::Point);
        assert_eq!(reader.bounding_box(), BoundingBox::new(-25.0, 4.0, 15.0, 15.0));

        let records: Vec<ShapeRecord> = reader.records().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].record_number, 2);
        assert_eq!(records[1].geometry, Geometry::Point(Point::new(15.0, 15.0)));
        assert_eq!(records[2].attributes["id"], AttributeValue::Integer(3));
        assert!(reader.read_record().unwrap().is_none());
        assert!(reader.notifications().is_empty());
    }

    #[test]
    fn test_without_attribute_source() {
        let mut reader = ShapefileReader::from_readers(Cursor::new(points_file()), None).unwrap();
        let first = reader.read_record().unwrap().unwrap();
        assert!(first.attributes.is_empty());
    }

    #[test]
    fn test_bad_file_code_strict_and_lenient() {
        let mut bytes = points_file();
        bytes[0..4].copy_from_slice(&1234u32.to_be_bytes());

        let strict = ShapefileReader::from_readers(Cursor::new(bytes.clone()), None);
        assert!(matches!(strict, Err(ShapefileError::InvalidHeader(_))));

        let config = ShapefileReaderConfiguration {
            strict_header: false,
            ..Default::default()
        };
        let mut lenient = ShapefileReader::from_readers_with_config(Cursor::new(bytes), None, config).unwrap();
        assert!(lenient.notifications().has_type(NotificationType::Warning));
        assert_eq!(lenient.records().count(), 3);
    }

    #[test]
    fn test_length_mismatch_is_a_warning() {
        let mut bytes = points_file();
        bytes[24..28].copy_from_slice(&60u32.to_be_bytes());
        let mut reader = ShapefileReader::from_readers(Cursor::new(bytes), None).unwrap();
        assert_eq!(reader.notifications().len(), 1);
        // end of data follows the real size
        assert_eq!(reader.records().count(), 3);
    }

    #[test]
    fn test_short_file_is_invalid() {
        let result = ShapefileReader::from_readers(Cursor::new(vec![0u8; 64]), None);
        assert!(matches!(result, Err(ShapefileError::InvalidHeader(_))));
    }

    #[test]
    fn test_truncated_record_fails_once() {
        let mut bytes = points_file();
        bytes.truncate(bytes.len() - 4);
        let mut reader = ShapefileReader::from_readers(Cursor::new(bytes), None).unwrap();
        let results: Vec<_> = reader.records().collect();
        assert_eq!(results.len(), 3);
        assert!(results[2].is_err());
    }
}
