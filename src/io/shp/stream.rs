//! Fixed-width primitive reads and writes with explicit byte order.
//!
//! Shapefiles mix big-endian record headers with little-endian payloads, so
//! every call names its byte order. Reads return `Ok(None)` when the stream
//! is exhausted before the first byte of the value; a value cut off part-way
//! is a read failure.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{FileKind, Result, ShapefileError};
use crate::types::{BoundingBox, Point};

/// Reader over one file of the triple, tracking the byte cursor.
pub struct ShpStreamReader<R> {
    inner: R,
    kind: FileKind,
    position: u64,
}

impl<R: Read + Seek> ShpStreamReader<R> {
    pub fn new(mut inner: R, kind: FileKind) -> Result<Self> {
        let position = inner.stream_position().map_err(ShapefileError::read(kind))?;
        Ok(Self { inner, kind, position })
    }

    /// Byte length of the underlying stream. The cursor is left unchanged.
    pub fn stream_len(&mut self) -> Result<u64> {
        let len = self
            .inner
            .seek(SeekFrom::End(0))
            .map_err(ShapefileError::read(self.kind))?;
        self.inner
            .seek(SeekFrom::Start(self.position))
            .map_err(ShapefileError::read(self.kind))?;
        Ok(len)
    }

    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.position = self
            .inner
            .seek(SeekFrom::Start(offset))
            .map_err(ShapefileError::read(self.kind))?;
        Ok(())
    }
}

impl<R: Read> ShpStreamReader<R> {
    /// Current byte offset
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    fn read_array<const N: usize>(&mut self) -> Result<Option<[u8; N]>> {
        let mut buf = [0u8; N];
        let mut filled = 0;
        while filled < N {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ShapefileError::FileReadFailed(self.kind, e)),
            }
        }
        self.position += filled as u64;
        match filled {
            0 => Ok(None),
            n if n == N => Ok(Some(buf)),
            n => Err(ShapefileError::FileReadFailed(
                self.kind,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("value truncated after {n} of {N} bytes"),
                ),
            )),
        }
    }

    /// 8-byte little-endian double
    pub fn read_f64(&mut self) -> Result<Option<f64>> {
        Ok(self.read_array::<8>()?.map(|b| LittleEndian::read_f64(&b)))
    }

    /// 4-byte little-endian unsigned integer
    pub fn read_u32_le(&mut self) -> Result<Option<u32>> {
        Ok(self.read_array::<4>()?.map(|b| LittleEndian::read_u32(&b)))
    }

    /// 4-byte big-endian unsigned integer
    pub fn read_u32_be(&mut self) -> Result<Option<u32>> {
        Ok(self.read_array::<4>()?.map(|b| BigEndian::read_u32(&b)))
    }

    fn required<T>(&self, value: Option<T>, what: &str) -> Result<T> {
        value.ok_or_else(|| {
            ShapefileError::FileReadFailed(
                self.kind,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("end of data while reading {what} at byte {}", self.position),
                ),
            )
        })
    }

    /// Double that must be present
    pub fn expect_f64(&mut self, what: &str) -> Result<f64> {
        let v = self.read_f64()?;
        self.required(v, what)
    }

    /// Little-endian integer that must be present
    pub fn expect_u32_le(&mut self, what: &str) -> Result<u32> {
        let v = self.read_u32_le()?;
        self.required(v, what)
    }

    /// Big-endian integer that must be present
    pub fn expect_u32_be(&mut self, what: &str) -> Result<u32> {
        let v = self.read_u32_be()?;
        self.required(v, what)
    }

    pub fn expect_point(&mut self) -> Result<Point> {
        let x = self.expect_f64("point x")?;
        let y = self.expect_f64("point y")?;
        Ok(Point::new(x, y))
    }

    /// xmin, ymin, xmax, ymax as little-endian doubles
    pub fn expect_bbox(&mut self) -> Result<BoundingBox> {
        Ok(BoundingBox::new(
            self.expect_f64("bbox xmin")?,
            self.expect_f64("bbox ymin")?,
            self.expect_f64("bbox xmax")?,
            self.expect_f64("bbox ymax")?,
        ))
    }
}

/// Writer over one output file of the triple.
pub struct ShpStreamWriter<W> {
    inner: W,
    kind: FileKind,
}

impl<W: Write> ShpStreamWriter<W> {
    pub fn new(inner: W, kind: FileKind) -> Self {
        Self { inner, kind }
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// 8-byte little-endian double
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.inner
            .write_f64::<LittleEndian>(value)
            .map_err(ShapefileError::write(self.kind))
    }

    /// 4-byte little-endian unsigned integer
    pub fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.inner
            .write_u32::<LittleEndian>(value)
            .map_err(ShapefileError::write(self.kind))
    }

    /// 4-byte big-endian unsigned integer
    pub fn write_u32_be(&mut self, value: u32) -> Result<()> {
        self.inner
            .write_u32::<BigEndian>(value)
            .map_err(ShapefileError::write(self.kind))
    }

    pub fn write_point(&mut self, point: &Point) -> Result<()> {
        self.write_f64(point.x)?;
        self.write_f64(point.y)
    }

    pub fn write_bbox(&mut self, bbox: &BoundingBox) -> Result<()> {
        self.write_f64(bbox.xmin)?;
        self.write_f64(bbox.ymin)?;
        self.write_f64(bbox.xmax)?;
        self.write_f64(bbox.ymax)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(ShapefileError::write(self.kind))
    }

    /// Get the inner writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> ShpStreamWriter<W> {
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(offset))
            .map(|_| ())
            .map_err(ShapefileError::write(self.kind))
    }
}
