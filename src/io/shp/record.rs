//! Per-record geometry encoding.
//!
//! Every record is `record number (BE) · content length in words (BE) ·
//! shape type (LE) · payload`. PolyLine and Polygon share one payload layout;
//! polygon grouping is rebuilt from ring orientation on read.

use std::io::{self, Read, Write};

use super::stream::{ShpStreamReader, ShpStreamWriter};
use crate::error::{FileKind, Result, ShapefileError};
use crate::geometry::{reconstruct_polygons, Geometry, MultiPoint, Part, PolygonGeometry, Polyline};
use crate::types::{BoundingBox, Point, ShapeType};

/// Record header size in 16-bit words (record number + content length)
pub const RECORD_HEADER_WORDS: u32 = 4;
/// Record header size in bytes
pub const RECORD_HEADER_BYTES: u64 = 8;

/// Upper bound on speculative pre-allocation from counts read off disk.
const MAX_PREALLOC: usize = 1 << 16;

/// How MultiPoint content lengths are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiPointLength {
    /// `24 + 8·n` words, the value written by existing tooling. Four words
    /// larger than the payload.
    #[default]
    Legacy,
    /// `20 + 8·n` words, the exact payload size.
    Exact,
}

/// Content length field for `geometry`, in 16-bit words.
///
/// Fails when the geometry is too large for the 32-bit length field.
pub fn content_length_words(geometry: &Geometry, multipoint: MultiPointLength) -> Result<u32> {
    let words = match geometry {
        Geometry::Null => 2,
        Geometry::Point(_) => 10,
        Geometry::MultiPoint(mp) => {
            let base = match multipoint {
                MultiPointLength::Legacy => 24,
                MultiPointLength::Exact => 20,
            };
            base + mp.points.len() as u64 * 8
        }
        Geometry::Polyline(pl) => 22 + pl.parts.len() as u64 * 2 + pl.num_points() as u64 * 8,
        Geometry::Polygon(pg) => 22 + pg.num_rings() as u64 * 2 + pg.num_points() as u64 * 8,
    };
    u32::try_from(words).map_err(|_| too_large("content length", words))
}

fn too_large(what: &str, value: u64) -> ShapefileError {
    ShapefileError::FileWriteFailed(
        FileKind::Shp,
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} {value} exceeds the 32-bit field"),
        ),
    )
}

/// A count or index as stored in a 32-bit field
fn checked_count(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| too_large(what, value as u64))
}

/// Bytes the record occupies on disk, header included.
pub fn record_byte_size(geometry: &Geometry) -> u64 {
    let content = match geometry {
        Geometry::Null => 4,
        Geometry::Point(_) => 20,
        Geometry::MultiPoint(mp) => 40 + 16 * mp.points.len() as u64,
        Geometry::Polyline(pl) => 44 + 4 * pl.parts.len() as u64 + 16 * pl.num_points() as u64,
        Geometry::Polygon(pg) => 44 + 4 * pg.num_rings() as u64 + 16 * pg.num_points() as u64,
    };
    RECORD_HEADER_BYTES + content
}

/// Encode one record. Returns the content length written, in words.
pub fn write_record<W: Write>(
    writer: &mut ShpStreamWriter<W>,
    record_number: u32,
    geometry: &Geometry,
    multipoint: MultiPointLength,
) -> Result<u32> {
    let length = content_length_words(geometry, multipoint)?;
    writer.write_u32_be(record_number)?;
    writer.write_u32_be(length)?;
    writer.write_u32_le(geometry.shape_type().code())?;

    match geometry {
        Geometry::Null => {}
        Geometry::Point(p) => writer.write_point(p)?,
        Geometry::MultiPoint(mp) => {
            writer.write_bbox(&mp.bbox.or_zero())?;
            writer.write_u32_le(checked_count(mp.points.len(), "point count")?)?;
            for p in &mp.points {
                writer.write_point(p)?;
            }
        }
        Geometry::Polyline(pl) => {
            write_parts(writer, &pl.bbox, pl.parts.iter())?;
        }
        Geometry::Polygon(pg) => {
            write_parts(writer, &pg.bbox, pg.rings())?;
        }
    }

    tracing::trace!(record_number, length, shape_type = %geometry.shape_type(), "wrote record");
    Ok(length)
}

fn write_parts<'a, W, I>(writer: &mut ShpStreamWriter<W>, bbox: &BoundingBox, parts: I) -> Result<()>
where
    W: Write,
    I: Iterator<Item = &'a Vec<Point>> + Clone,
{
    let num_parts = checked_count(parts.clone().count(), "part count")?;
    let num_points = checked_count(parts.clone().map(Vec::len).sum(), "point count")?;

    writer.write_bbox(&bbox.or_zero())?;
    writer.write_u32_le(num_parts)?;
    writer.write_u32_le(num_points)?;

    // start indices stay below num_points, which fits
    let mut index = 0u32;
    for part in parts.clone() {
        writer.write_u32_le(index)?;
        index += part.len() as u32;
    }
    for part in parts {
        for p in part {
            writer.write_point(p)?;
        }
    }
    Ok(())
}

/// One record as decoded from the `.shp` stream
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub record_number: u32,
    pub content_length_words: u32,
    pub geometry: Geometry,
}

/// Decode the record at the cursor. `Ok(None)` at end of data.
///
/// Records must be `Null` or `file_type`; anything else is a
/// [`ShapefileError::WrongRecordType`].
pub fn read_record<R: Read>(reader: &mut ShpStreamReader<R>, file_type: ShapeType) -> Result<Option<RawRecord>> {
    let Some(record_number) = reader.read_u32_be()? else {
        return Ok(None);
    };
    let content_length_words = reader.expect_u32_be("content length")?;
    let found = ShapeType::from_code(reader.expect_u32_le("record shape type")?)?;
    if !found.fits_file(file_type) {
        return Err(ShapefileError::WrongRecordType {
            expected: file_type,
            found,
        });
    }

    let geometry = match found {
        ShapeType::Null => Geometry::Null,
        ShapeType::Point => Geometry::Point(reader.expect_point()?),
        ShapeType::MultiPoint => Geometry::MultiPoint(read_multipoint(reader)?),
        ShapeType::PolyLine => {
            let (bbox, parts) = read_parts(reader)?;
            Geometry::Polyline(Polyline { bbox, parts })
        }
        ShapeType::Polygon => {
            let (bbox, rings) = read_parts(reader)?;
            Geometry::Polygon(PolygonGeometry {
                bbox,
                polygons: reconstruct_polygons(rings)?,
            })
        }
    };

    tracing::trace!(record_number, content_length_words, shape_type = %found, "read record");
    Ok(Some(RawRecord {
        record_number,
        content_length_words,
        geometry,
    }))
}

fn read_multipoint<R: Read>(reader: &mut ShpStreamReader<R>) -> Result<MultiPoint> {
    let bbox = reader.expect_bbox()?;
    let num_points = reader.expect_u32_le("point count")? as usize;
    let mut points = Vec::with_capacity(num_points.min(MAX_PREALLOC));
    for _ in 0..num_points {
        points.push(reader.expect_point()?);
    }
    Ok(MultiPoint { bbox, points })
}

fn read_parts<R: Read>(reader: &mut ShpStreamReader<R>) -> Result<(BoundingBox, Vec<Part>)> {
    let bbox = reader.expect_bbox()?;
    let num_parts = reader.expect_u32_le("part count")? as usize;
    let num_points = reader.expect_u32_le("point count")? as usize;

    let mut starts = Vec::with_capacity(num_parts.min(MAX_PREALLOC));
    for _ in 0..num_parts {
        starts.push(reader.expect_u32_le("part index")? as usize);
    }
    let well_formed = starts.first().map_or(num_points == 0, |&s| s == 0)
        && starts.windows(2).all(|w| w[0] <= w[1])
        && starts.last().map_or(true, |&s| s <= num_points);
    if !well_formed {
        return Err(ShapefileError::FileReadFailed(
            FileKind::Shp,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("part indices {starts:?} do not partition {num_points} points"),
            ),
        ));
    }

    let mut parts = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(num_points);
        let mut part = Vec::with_capacity((end - start).min(MAX_PREALLOC));
        for _ in start..end {
            part.push(reader.expect_point()?);
        }
        parts.push(part);
    }
    Ok((bbox, parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use std::io::Cursor;

    fn encode(geometry: &Geometry, multipoint: MultiPointLength) -> (Vec<u8>, u32) {
        let mut w = ShpStreamWriter::new(Vec::new(), FileKind::Shp);
        let len = write_record(&mut w, 1, geometry, multipoint).unwrap();
        (w.into_inner(), len)
    }

    fn decode(bytes: Vec<u8>, file_type: ShapeType) -> Result<Option<RawRecord>> {
        let mut r = ShpStreamReader::new(Cursor::new(bytes), FileKind::Shp).unwrap();
        read_record(&mut r, file_type)
    }

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_null_record() {
        let (bytes, len) = encode(&Geometry::Null, MultiPointLength::Legacy);
        assert_eq!(len, 2);
        assert_eq!(bytes.len() as u64, record_byte_size(&Geometry::Null));
        assert_eq!(&bytes[0..4], &1u32.to_be_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &0u32.to_le_bytes());
    }

    #[test]
    fn test_point_record_layout() {
        let g = Geometry::Point(Point::new(3.0, 4.0));
        let (bytes, len) = encode(&g, MultiPointLength::Legacy);
        assert_eq!(len, 10);
        assert_eq!(bytes.len(), 28);
        assert_eq!(&bytes[12..20], &3.0f64.to_le_bytes());
        assert_eq!(&bytes[20..28], &4.0f64.to_le_bytes());
        let decoded = decode(bytes, ShapeType::Point).unwrap().unwrap();
        assert_eq!(decoded.geometry, g);
    }

    #[test]
    fn test_multipoint_lengths() {
        let g = Geometry::MultiPoint(MultiPoint::new(pts(&[(3.0, 4.0), (15.0, 15.0), (-25.0, 13.0)])));
        assert_eq!(content_length_words(&g, MultiPointLength::Legacy).unwrap(), 48);
        assert_eq!(content_length_words(&g, MultiPointLength::Exact).unwrap(), 44);
        let (bytes, _) = encode(&g, MultiPointLength::Legacy);
        assert_eq!(bytes.len() as u64, record_byte_size(&g));
        assert_eq!(bytes.len(), 8 + 44 * 2);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_counts_beyond_32_bits_rejected() {
        assert_eq!(checked_count(7, "point count").unwrap(), 7);
        let err = checked_count(u32::MAX as usize + 1, "point count").unwrap_err();
        assert!(matches!(err, ShapefileError::FileWriteFailed(FileKind::Shp, _)));
        assert!(err.to_string().contains("point count"));
    }

    #[test]
    fn test_polyline_record() {
        let g = Geometry::Polyline(Polyline::new(vec![
            pts(&[(3.0, 4.0), (15.0, 15.0), (-25.0, 13.0)]),
            pts(&[(1.0, 5.0), (2.0, -9.0), (-4.0, 4.0)]),
        ]));
        let (bytes, len) = encode(&g, MultiPointLength::Legacy);
        assert_eq!(len, 22 + 2 * 2 + 6 * 8);
        assert_eq!(bytes.len() as u64, 8 + u64::from(len) * 2);
        // part start indices follow the counts
        assert_eq!(&bytes[52..56], &0u32.to_le_bytes());
        assert_eq!(&bytes[56..60], &3u32.to_le_bytes());
        let decoded = decode(bytes, ShapeType::PolyLine).unwrap().unwrap();
        assert_eq!(decoded.geometry, g);
        assert_eq!(decoded.content_length_words, len);
    }

    #[test]
    fn test_polygon_rings_regrouped() {
        let outer = pts(&[(1.0, 1.0), (1.0, 10.0), (10.0, 10.0), (10.0, 1.0), (1.0, 1.0)]);
        let hole = pts(&[(2.0, 2.0), (9.0, 2.0), (5.0, 9.0), (2.0, 2.0)]);
        let second = pts(&[(20.0, 20.0), (20.0, 30.0), (30.0, 30.0), (20.0, 20.0)]);
        let g = Geometry::Polygon(PolygonGeometry::new(vec![
            Polygon::new(outer, vec![hole]),
            Polygon::new(second, vec![]),
        ]));
        let (bytes, _) = encode(&g, MultiPointLength::Legacy);
        let decoded = decode(bytes, ShapeType::Polygon).unwrap().unwrap();
        assert_eq!(decoded.geometry, g);
    }

    #[test]
    fn test_null_allowed_in_typed_file() {
        let (bytes, _) = encode(&Geometry::Null, MultiPointLength::Legacy);
        let decoded = decode(bytes, ShapeType::Polygon).unwrap().unwrap();
        assert!(decoded.geometry.is_null());
    }

    #[test]
    fn test_wrong_record_type() {
        let (bytes, _) = encode(&Geometry::Point(Point::new(1.0, 1.0)), MultiPointLength::Legacy);
        assert!(matches!(
            decode(bytes, ShapeType::MultiPoint),
            Err(ShapefileError::WrongRecordType {
                expected: ShapeType::MultiPoint,
                found: ShapeType::Point
            })
        ));
    }

    #[test]
    fn test_end_of_data() {
        assert!(decode(Vec::new(), ShapeType::Point).unwrap().is_none());
    }

    #[test]
    fn test_bad_part_indices() {
        let g = Geometry::Polyline(Polyline::new(vec![pts(&[(0.0, 0.0), (1.0, 1.0)])]));
        let (mut bytes, _) = encode(&g, MultiPointLength::Legacy);
        // first part index at byte 52 must be zero
        bytes[52..56].copy_from_slice(&5u32.to_le_bytes());
        assert!(matches!(
            decode(bytes, ShapeType::PolyLine),
            Err(ShapefileError::FileReadFailed(FileKind::Shp, _))
        ));
    }
}
