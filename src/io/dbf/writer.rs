//! dBase III attribute table writer

use std::io::{Seek, SeekFrom, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{LittleEndian, WriteBytesExt};
use encoding_rs::Encoding;

use super::code_page::language_driver_for;
use super::{
    DBF_VERSION, END_OF_FILE, FIELD_DESCRIPTOR_SIZE, HEADER_TERMINATOR, ROW_ACTIVE, TABLE_HEADER_SIZE,
};
use crate::attributes::{AttributeSink, AttributeValue, Attributes, FieldDescriptor, FieldKind, Schema};
use crate::error::{FileKind, Result, ShapefileError};

/// Writes rows for a fixed schema. The record count in the header is patched
/// by [`AttributeSink::finish`].
pub struct DbfWriter<W: Write + Seek> {
    writer: W,
    schema: Schema,
    encoding: &'static Encoding,
    record_count: u32,
}

impl<W: Write + Seek> DbfWriter<W> {
    /// Create a writer and emit the table header with a zero record count.
    pub fn new(writer: W, schema: Schema, encoding: &'static Encoding) -> Result<Self> {
        schema.check()?;
        let mut this = Self {
            writer,
            schema,
            encoding,
            record_count: 0,
        };
        this.write_header()?;
        this.write_field_descriptors()?;
        Ok(this)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Get the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn header_length(&self) -> u16 {
        (TABLE_HEADER_SIZE + FIELD_DESCRIPTOR_SIZE * self.schema.fields().len() + 1) as u16
    }

    fn write_header(&mut self) -> Result<()> {
        let (year, month, day) = today();
        let header_length = self.header_length();
        let record_length = self.schema.record_length() as u16;
        let ldid = language_driver_for(self.encoding);
        let count = self.record_count;

        let w = &mut self.writer;
        let io = (|| -> std::io::Result<()> {
            w.seek(SeekFrom::Start(0))?;
            w.write_u8(DBF_VERSION)?;
            w.write_all(&[year, month, day])?;
            w.write_u32::<LittleEndian>(count)?;
            w.write_u16::<LittleEndian>(header_length)?;
            w.write_u16::<LittleEndian>(record_length)?;
            let mut reserved = [0u8; 20];
            reserved[17] = ldid; // byte 29 of the header
            w.write_all(&reserved)?;
            Ok(())
        })();
        io.map_err(ShapefileError::write(FileKind::Dbf))
    }

    fn write_field_descriptors(&mut self) -> Result<()> {
        let w = &mut self.writer;
        let fields = self.schema.fields();
        let io = (|| -> std::io::Result<()> {
            for field in fields {
                let mut name = [0u8; 11];
                name[..field.name.len()].copy_from_slice(field.name.as_bytes());
                w.write_all(&name)?;
                w.write_u8(field.kind.dbf_type())?;
                w.write_all(&[0u8; 4])?;
                w.write_u8(field.length)?;
                w.write_u8(field.decimal_count)?;
                w.write_all(&[0u8; 14])?;
            }
            w.write_u8(HEADER_TERMINATOR)
        })();
        io.map_err(ShapefileError::write(FileKind::Dbf))
    }

    fn encode_field(&self, field: &FieldDescriptor, value: Option<&AttributeValue>) -> Result<Vec<u8>> {
        let width = usize::from(field.length);
        let value = value.unwrap_or(&AttributeValue::Null);
        if let Some(kind) = value.kind() {
            if kind != field.kind {
                return Err(ShapefileError::AttributeEncoding(format!(
                    "field \"{}\" expects {}, found {}",
                    field.name, field.kind, kind
                )));
            }
        }

        let mut bytes = match (field.kind, value) {
            (FieldKind::Text, AttributeValue::Text(s)) => self.encode_text(field, s, width)?,
            _ => {
                let rendered = field.render(value);
                if rendered.len() > width {
                    return Err(ShapefileError::AttributeEncoding(format!(
                        "value {rendered} does not fit field \"{}\" of width {width}",
                        field.name
                    )));
                }
                // numbers are right aligned
                format!("{rendered:>width$}").into_bytes()
            }
        };
        bytes.resize(width, b' ');
        Ok(bytes)
    }

    /// Encode left-aligned text. Text the encoding cannot represent or that
    /// is wider than the field is rejected, never cut or substituted.
    fn encode_text(&self, field: &FieldDescriptor, text: &str, width: usize) -> Result<Vec<u8>> {
        let (encoded, _, unmappable) = self.encoding.encode(text);
        if unmappable {
            return Err(ShapefileError::AttributeEncoding(format!(
                "value for field \"{}\" has characters {} cannot represent",
                field.name,
                self.encoding.name()
            )));
        }
        if encoded.len() > width {
            return Err(ShapefileError::AttributeEncoding(format!(
                "value for field \"{}\" is {} bytes, wider than {width}",
                field.name,
                encoded.len()
            )));
        }
        Ok(encoded.into_owned())
    }
}

impl<W: Write + Seek> AttributeSink for DbfWriter<W> {
    fn append_row(&mut self, attributes: &Attributes) -> Result<()> {
        let mut row = Vec::with_capacity(self.schema.record_length());
        row.push(ROW_ACTIVE);
        for field in self.schema.fields() {
            row.extend(self.encode_field(field, attributes.get(&field.name))?);
        }
        self.writer
            .write_all(&row)
            .map_err(ShapefileError::write(FileKind::Dbf))?;
        self.record_count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .seek(SeekFrom::End(0))
            .and_then(|_| self.writer.write_u8(END_OF_FILE))
            .map_err(ShapefileError::write(FileKind::Dbf))?;
        self.write_header()?;
        self.writer
            .flush()
            .map_err(ShapefileError::write(FileKind::Dbf))?;
        tracing::debug!(records = self.record_count, "finished attribute table");
        Ok(())
    }
}

/// Current UTC date as (years since 1900, month, day).
fn today() -> (u8, u8, u8) {
    let days = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() / 86_400)
        .unwrap_or(0) as i64;
    let (year, month, day) = civil_from_days(days);
    ((year - 1900).clamp(0, 255) as u8, month, day)
}

/// Days since 1970-01-01 to a proleptic Gregorian date, using Howard
/// Hinnant's `civil_from_days` (era / day-of-era decomposition, March-based
/// year).
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
