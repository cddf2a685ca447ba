//! ESRI Shapefile geometry (`.shp`) and index (`.shx`) reading and writing

mod header;
mod index;
mod reader;
mod record;
mod session;
mod stream;
mod writer;

pub use header::{read_header, write_header, FileHeader, FILE_CODE, HEADER_SIZE, HEADER_WORDS, VERSION};
pub use index::{index_length_words, read_index, write_index_entry, IndexBuilder, IndexEntry, INDEX_ENTRY_BYTES};
pub use reader::{ReadSeek, ShapefileReader, ShapefileReaderConfiguration};
pub use record::{
    content_length_words, read_record, record_byte_size, write_record, MultiPointLength, RawRecord,
    RECORD_HEADER_BYTES, RECORD_HEADER_WORDS,
};
pub use session::{SessionState, Shapefile, ShapefilePaths};
pub use stream::{ShpStreamReader, ShpStreamWriter};
pub use writer::{ShapefileWriter, ShapefileWriterConfiguration};
