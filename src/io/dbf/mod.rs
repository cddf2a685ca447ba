//! dBase III attribute tables (`.dbf`) and their `.cpg` code page sidecar.
//!
//! Rows are positional: row `n` holds the attributes of geometry record `n`.

pub mod code_page;
mod reader;
mod writer;

pub use code_page::{cpg_label, encoding_from_cpg, encoding_from_language_driver, FALLBACK_ENCODING};
pub use reader::DbfReader;
pub use writer::DbfWriter;

/// Version byte of a plain dBase III table without memo file
pub const DBF_VERSION: u8 = 0x03;
/// Size of the fixed table header
pub const TABLE_HEADER_SIZE: usize = 32;
/// Size of one field descriptor
pub const FIELD_DESCRIPTOR_SIZE: usize = 32;
/// Byte closing the field descriptor array
pub const HEADER_TERMINATOR: u8 = 0x0D;
/// Byte following the last row
pub const END_OF_FILE: u8 = 0x1A;
/// Deletion flag of a live row
pub const ROW_ACTIVE: u8 = b' ';
/// Deletion flag of a deleted row
pub const ROW_DELETED: u8 = b'*';
