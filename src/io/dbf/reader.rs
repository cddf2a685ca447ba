//! dBase III attribute table reader

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::Encoding;

use super::code_page::{encoding_from_language_driver, FALLBACK_ENCODING};
use super::{FIELD_DESCRIPTOR_SIZE, HEADER_TERMINATOR, ROW_DELETED, TABLE_HEADER_SIZE};
use crate::attributes::{AttributeSource, AttributeValue, Attributes, FieldDescriptor, FieldKind, Schema};
use crate::error::{FileKind, Result, ShapefileError};
use crate::notification::{NotificationCollection, NotificationType};

/// Random-access reader over the rows of a `.dbf` table.
pub struct DbfReader<R: Read + Seek> {
    reader: R,
    schema: Schema,
    encoding: &'static Encoding,
    record_count: u32,
    header_length: u16,
    record_length: u16,
    notifications: NotificationCollection,
}

impl<R: Read + Seek> DbfReader<R> {
    /// Parse the table header and field descriptors.
    ///
    /// `encoding` overrides the language driver byte; without either the
    /// text is decoded as Windows-1252.
    pub fn from_reader(mut reader: R, encoding: Option<&'static Encoding>) -> Result<Self> {
        let mut notifications = NotificationCollection::new();
        let mut header = [0u8; TABLE_HEADER_SIZE];
        reader
            .seek(SeekFrom::Start(0))
            .and_then(|_| reader.read_exact(&mut header))
            .map_err(ShapefileError::read(FileKind::Dbf))?;

        let version = header[0];
        if !matches!(version & 0x07, 0x03 | 0x04) {
            notifications.notify(
                NotificationType::Warning,
                format!("Unexpected dBase version byte 0x{version:02X}"),
            );
        }
        let mut fixed = &header[4..12];
        let record_count = fixed.read_u32::<LittleEndian>().map_err(ShapefileError::read(FileKind::Dbf))?;
        let header_length = fixed.read_u16::<LittleEndian>().map_err(ShapefileError::read(FileKind::Dbf))?;
        let record_length = fixed.read_u16::<LittleEndian>().map_err(ShapefileError::read(FileKind::Dbf))?;
        if usize::from(header_length) < TABLE_HEADER_SIZE + 1 || record_length == 0 {
            return Err(ShapefileError::AttributeEncoding(format!(
                "attribute table header declares {header_length} header bytes and {record_length} byte rows"
            )));
        }

        let encoding = encoding
            .or_else(|| encoding_from_language_driver(header[29]))
            .unwrap_or(FALLBACK_ENCODING);

        let schema = Self::read_fields(&mut reader, header_length, &mut notifications)?;
        let fields_width: usize = schema.record_length();
        if fields_width != usize::from(record_length) {
            notifications.notify(
                NotificationType::Warning,
                format!("Row length {record_length} differs from the {fields_width} bytes its fields span"),
            );
        }

        tracing::debug!(
            records = record_count,
            fields = schema.fields().len(),
            encoding = encoding.name(),
            "opened attribute table"
        );

        Ok(Self {
            reader,
            schema,
            encoding,
            record_count,
            header_length,
            record_length,
            notifications,
        })
    }

    fn read_fields(
        reader: &mut R,
        header_length: u16,
        notifications: &mut NotificationCollection,
    ) -> Result<Schema> {
        let max_fields = (usize::from(header_length) - TABLE_HEADER_SIZE - 1) / FIELD_DESCRIPTOR_SIZE;
        let mut fields = Vec::with_capacity(max_fields);
        let mut descriptor = [0u8; FIELD_DESCRIPTOR_SIZE];

        for _ in 0..max_fields {
            reader
                .read_exact(&mut descriptor[..1])
                .map_err(ShapefileError::read(FileKind::Dbf))?;
            if descriptor[0] == HEADER_TERMINATOR {
                break;
            }
            reader
                .read_exact(&mut descriptor[1..])
                .map_err(ShapefileError::read(FileKind::Dbf))?;

            let name_end = descriptor[..11].iter().position(|&b| b == 0).unwrap_or(11);
            let name = String::from_utf8_lossy(&descriptor[..name_end]).trim().to_string();
            let type_code = descriptor[11];
            let length = descriptor[16];
            let decimal_count = descriptor[17];

            let kind = match type_code {
                b'N' if decimal_count == 0 => FieldKind::Integer,
                b'N' | b'F' => FieldKind::Real,
                b'C' | b'D' | b'T' => FieldKind::Text,
                b'L' => FieldKind::Boolean,
                b'M' => {
                    notifications.notify(
                        NotificationType::NotSupported,
                        format!("Memo field \"{name}\" is read as raw text"),
                    );
                    FieldKind::Text
                }
                other => {
                    notifications.notify(
                        NotificationType::Warning,
                        format!("Unknown field type '{}' for \"{name}\", read as text", other as char),
                    );
                    FieldKind::Text
                }
            };

            fields.push(FieldDescriptor {
                name,
                kind,
                length,
                decimal_count,
            });
        }

        Ok(Schema::new(fields))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Number of rows declared by the header
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    pub fn notifications(&self) -> &NotificationCollection {
        &self.notifications
    }

    /// Raw bytes of row `record_number` (1-based), deletion flag included.
    fn read_row(&mut self, record_number: u32) -> Result<Vec<u8>> {
        if record_number == 0 || record_number > self.record_count {
            return Err(ShapefileError::RecordNotFound(record_number));
        }
        let offset = u64::from(self.header_length)
            + u64::from(record_number - 1) * u64::from(self.record_length);
        let mut row = vec![0u8; usize::from(self.record_length)];
        self.reader
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.reader.read_exact(&mut row))
            .map_err(ShapefileError::read(FileKind::Dbf))?;
        Ok(row)
    }

    /// Whether row `record_number` carries the deletion flag.
    pub fn is_deleted(&mut self, record_number: u32) -> Result<bool> {
        Ok(self.read_row(record_number)?[0] == ROW_DELETED)
    }

    fn decode_value(&mut self, field: &FieldDescriptor, raw: &[u8]) -> AttributeValue {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(raw);
        if had_errors {
            self.notifications.notify(
                NotificationType::Warning,
                format!("Field \"{}\" holds bytes invalid in {}", field.name, self.encoding.name()),
            );
        }
        let trimmed = text.trim_matches(|c: char| c == ' ' || c == '\0');
        if trimmed.is_empty() {
            return AttributeValue::Null;
        }

        match field.kind {
            FieldKind::Text => AttributeValue::Text(text.trim_end_matches([' ', '\0']).to_string()),
            FieldKind::Boolean => match trimmed {
                "T" | "t" | "Y" | "y" => AttributeValue::Boolean(true),
                "F" | "f" | "N" | "n" => AttributeValue::Boolean(false),
                _ => AttributeValue::Null,
            },
            FieldKind::Integer | FieldKind::Real if trimmed.starts_with('*') => AttributeValue::Null,
            FieldKind::Integer => match trimmed.parse::<i64>() {
                Ok(v) => AttributeValue::Integer(v),
                Err(_) => self.parse_real(field, trimmed),
            },
            FieldKind::Real => self.parse_real(field, trimmed),
        }
    }

    fn parse_real(&mut self, field: &FieldDescriptor, text: &str) -> AttributeValue {
        match text.parse::<f64>() {
            Ok(v) => AttributeValue::Real(v),
            Err(_) => {
                self.notifications.notify(
                    NotificationType::Warning,
                    format!("Field \"{}\" holds non-numeric value \"{text}\"", field.name),
                );
                AttributeValue::Null
            }
        }
    }
}

impl<R: Read + Seek> AttributeSource for DbfReader<R> {
    fn row_at(&mut self, record_number: u32) -> Result<Attributes> {
        let row = self.read_row(record_number)?;
        if row[0] == ROW_DELETED {
            self.notifications.notify(
                NotificationType::Warning,
                format!("Attribute row {record_number} is marked deleted"),
            );
        }

        let fields = self.schema.fields().to_vec();
        let mut attributes = Attributes::with_capacity(fields.len());
        let mut offset = 1;
        for field in &fields {
            let end = (offset + usize::from(field.length)).min(row.len());
            let value = self.decode_value(field, &row[offset.min(end)..end]);
            attributes.insert(field.name.clone(), value);
            offset = end;
        }
        Ok(attributes)
    }

    fn drain_notifications(&mut self, into: &mut NotificationCollection) {
        into.append(&mut self.notifications);
    }
}
