//! `.shx` index entries.
//!
//! After the shared 100-byte header the index holds one 8-byte entry per
//! record: the record's offset in the `.shp` file and its content length,
//! both big-endian and counted in 16-bit words.

use std::io::{Read, Seek, Write};

use super::header::{read_header, FileHeader, HEADER_WORDS};
use super::record::RECORD_HEADER_WORDS;
use super::stream::{ShpStreamReader, ShpStreamWriter};
use crate::error::Result;

/// Bytes per index entry
pub const INDEX_ENTRY_BYTES: u64 = 8;

/// Location of one record in the `.shp` file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub offset_words: u32,
    pub length_words: u32,
}

impl IndexEntry {
    /// Byte offset of the record header in the `.shp` file
    pub fn offset_bytes(&self) -> u64 {
        u64::from(self.offset_words) * 2
    }
}

/// Produces consecutive entries: the first record sits right after the
/// header, each following one `length + 4` words further on.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    next_offset: u32,
    entries: Vec<IndexEntry>,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self {
            next_offset: HEADER_WORDS,
            entries: Vec::new(),
        }
    }
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the next record and return its entry.
    pub fn push(&mut self, length_words: u32) -> IndexEntry {
        let entry = IndexEntry {
            offset_words: self.next_offset,
            length_words,
        };
        self.next_offset = self
            .next_offset
            .saturating_add(length_words)
            .saturating_add(RECORD_HEADER_WORDS);
        self.entries.push(entry);
        entry
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

/// Index file length in words for `count` records, header included
pub fn index_length_words(count: usize) -> u64 {
    (count as u64 * INDEX_ENTRY_BYTES + 100) / 2
}

pub fn write_index_entry<W: Write>(writer: &mut ShpStreamWriter<W>, entry: &IndexEntry) -> Result<()> {
    writer.write_u32_be(entry.offset_words)?;
    writer.write_u32_be(entry.length_words)
}

/// Read the header and every entry of an index file.
pub fn read_index<R: Read + Seek>(reader: &mut ShpStreamReader<R>) -> Result<(FileHeader, Vec<IndexEntry>)> {
    let header = read_header(reader)?;
    let mut entries = Vec::new();
    while let Some(offset_words) = reader.read_u32_be()? {
        let length_words = reader.expect_u32_be("index length")?;
        entries.push(IndexEntry {
            offset_words,
            length_words,
        });
    }
    Ok((header, entries))
}
