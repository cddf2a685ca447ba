//! Error types for shptools library

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::attributes::AttributeError;
use crate::types::ShapeType;

/// Which direction a session was already committed to when the conflicting
/// call arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeConflict {
    /// A read was attempted while records are buffered for writing.
    ReadWhileWriting,
    /// A write was attempted while the session is reading a file.
    WriteWhileReading,
}

impl fmt::Display for ModeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadWhileWriting => write!(f, "Cannot read while in write mode"),
            Self::WriteWhileReading => write!(f, "Cannot write while in read mode"),
        }
    }
}

/// Which file of the triple an I/O failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.shp` geometry file
    Shp,
    /// `.shx` index file
    Shx,
    /// `.dbf` attribute table
    Dbf,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shp => write!(f, "SHP"),
            Self::Shx => write!(f, "SHX"),
            Self::Dbf => write!(f, "DBF"),
        }
    }
}

/// Main error type for shptools operations
#[derive(Debug, Error)]
pub enum ShapefileError {
    /// A source file is missing or unreadable
    #[error("Impossible to open {kind} file {path:?}: {source}")]
    FileOpenFailed {
        kind: FileKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O failure while reading
    #[error("Unable to read {0} file: {1}")]
    FileReadFailed(FileKind, #[source] io::Error),

    /// I/O failure while writing
    #[error("Unable to write {0} file: {1}")]
    FileWriteFailed(FileKind, #[source] io::Error),

    /// Read/write call against a session committed to the other direction
    #[error("{0}")]
    ModeConflict(ModeConflict),

    /// Unknown or unmapped shape type code
    #[error("Shape type not supported: \"{0}\"")]
    ShapeTypeNotSupported(i64),

    /// Decoded record disagrees with the file's shape type
    #[error("Record has wrong shape type: expected {expected}, found {found}")]
    WrongRecordType { expected: ShapeType, found: ShapeType },

    /// Ring orientation undecidable even at the largest scale factor
    #[error("Polygon area too small: can't determine vertex orientation")]
    PolygonAreaTooSmall,

    /// One or more buffered records failed attribute validation
    #[error("Attribute validation failed with {} error(s)", .0.len())]
    AttributeValidationFailed(Vec<AttributeError>),

    /// File header is malformed
    #[error("Invalid file header: {0}")]
    InvalidHeader(String),

    /// Attribute value could not be encoded or decoded
    #[error("Attribute encoding error: {0}")]
    AttributeEncoding(String),

    /// Attribute row requested beyond the end of the table
    #[error("Attribute row not found: record {0}")]
    RecordNotFound(u32),
}

impl ShapefileError {
    /// Stable numeric code for this error kind.
    pub fn code(&self) -> u32 {
        match self {
            Self::FileOpenFailed { kind: FileKind::Dbf, .. } => 12,
            Self::FileOpenFailed { .. } => 11,
            Self::FileReadFailed(FileKind::Dbf, _) => 14,
            Self::FileReadFailed(_, _) => 13,
            Self::FileWriteFailed(FileKind::Shp, _) => 15,
            Self::FileWriteFailed(FileKind::Shx, _) => 16,
            Self::FileWriteFailed(FileKind::Dbf, _) => 17,
            Self::ModeConflict(ModeConflict::ReadWhileWriting) => 18,
            Self::ModeConflict(ModeConflict::WriteWhileReading) => 19,
            Self::ShapeTypeNotSupported(_) => 21,
            Self::WrongRecordType { .. } => 22,
            Self::PolygonAreaTooSmall => 31,
            Self::AttributeValidationFailed(_) => 41,
            Self::InvalidHeader(_) => 42,
            Self::AttributeEncoding(_) => 43,
            Self::RecordNotFound(_) => 44,
        }
    }

    pub(crate) fn read(kind: FileKind) -> impl FnOnce(io::Error) -> Self {
        move |e| Self::FileReadFailed(kind, e)
    }

    pub(crate) fn write(kind: FileKind) -> impl FnOnce(io::Error) -> Self {
        move |e| Self::FileWriteFailed(kind, e)
    }
}

impl From<ModeConflict> for ShapefileError {
    fn from(conflict: ModeConflict) -> Self {
        ShapefileError::ModeConflict(conflict)
    }
}

/// Result type alias for shptools operations
pub type Result<T> = std::result::Result<T, ShapefileError>;
