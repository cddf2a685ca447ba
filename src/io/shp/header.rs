//! The 100-byte header shared by `.shp` and `.shx` files.
//!
//! ```text
//! offset  field          order
//!      0  file code      BE   (9994)
//!      4  unused x5      BE
//!     24  file length    BE   (16-bit words, header included)
//!     28  version        LE   (1000)
//!     32  shape type     LE
//!     36  bbox           LE   (xmin, ymin, xmax, ymax)
//!     68  z range        LE   (zmin, zmax)
//!     84  m range        LE   (mmin, mmax)
//! ```

use std::io::{Read, Seek, Write};

use super::stream::{ShpStreamReader, ShpStreamWriter};
use crate::error::Result;
use crate::types::{BoundingBox, ShapeType};

/// Fixed header size in bytes
pub const HEADER_SIZE: u64 = 100;
/// Fixed header size in 16-bit words; the first record's index offset
pub const HEADER_WORDS: u32 = 50;
/// Magic number at offset 0
pub const FILE_CODE: u32 = 9994;
/// Format version at offset 28
pub const VERSION: u32 = 1000;

/// Parsed or to-be-written file header
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub file_code: u32,
    /// Total file length in 16-bit words, header included
    pub file_length_words: u32,
    pub version: u32,
    pub shape_type: ShapeType,
    pub bbox: BoundingBox,
    pub z_range: (f64, f64),
    pub m_range: (f64, f64),
}

impl FileHeader {
    /// Header for a new file. Null-typed files always carry the zero box.
    pub fn new(shape_type: ShapeType, bbox: BoundingBox, file_length_words: u32) -> Self {
        let bbox = if shape_type == ShapeType::Null {
            BoundingBox::zero()
        } else {
            bbox.or_zero()
        };
        FileHeader {
            file_code: FILE_CODE,
            file_length_words,
            version: VERSION,
            shape_type,
            bbox,
            z_range: (0.0, 0.0),
            m_range: (0.0, 0.0),
        }
    }

    /// Declared file length in bytes
    pub fn file_length_bytes(&self) -> u64 {
        u64::from(self.file_length_words) * 2
    }
}

/// Write `header` at the start of the stream and leave the cursor at byte 100.
pub fn write_header<W: Write + Seek>(writer: &mut ShpStreamWriter<W>, header: &FileHeader) -> Result<()> {
    writer.seek(0)?;
    writer.write_u32_be(header.file_code)?;
    for _ in 0..5 {
        writer.write_u32_be(0)?;
    }
    writer.write_u32_be(header.file_length_words)?;
    writer.write_u32_le(header.version)?;
    writer.write_u32_le(header.shape_type.code())?;
    writer.write_bbox(&header.bbox)?;
    writer.write_f64(header.z_range.0)?;
    writer.write_f64(header.z_range.1)?;
    writer.write_f64(header.m_range.0)?;
    writer.write_f64(header.m_range.1)?;
    writer.seek(HEADER_SIZE)
}

/// Parse the header at the start of the stream and leave the cursor at byte
/// 100. Field values are returned as found; judging them is up to the caller.
pub fn read_header<R: Read + Seek>(reader: &mut ShpStreamReader<R>) -> Result<FileHeader> {
    reader.seek(0)?;
    let file_code = reader.expect_u32_be("file code")?;
    reader.seek(24)?;
    let file_length_words = reader.expect_u32_be("file length")?;
    let version = reader.expect_u32_le("version")?;
    let shape_type = ShapeType::from_code(reader.expect_u32_le("shape type")?)?;
    let bbox = reader.expect_bbox()?;
    let z_range = (reader.expect_f64("zmin")?, reader.expect_f64("zmax")?);
    let m_range = (reader.expect_f64("mmin")?, reader.expect_f64("mmax")?);
    reader.seek(HEADER_SIZE)?;

    tracing::debug!(
        file = %reader.kind(),
        %shape_type,
        file_length_words,
        "parsed header"
    );

    Ok(FileHeader {
        file_code,
        file_length_words,
        version,
        shape_type,
        bbox,
        z_range,
        m_range,
    })
}
