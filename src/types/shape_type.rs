//! Shapefile shape type codes.
//!
//! Only the 2D types are supported; Z and M variants (11, 13, 15, 18, 21,
//! 23, 25, 28, 31) are rejected with `ShapeTypeNotSupported`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ShapefileError};

/// Supported shape type codes as written in the header and record payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ShapeType {
    Null = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
}

impl ShapeType {
    /// All supported shape types in code order.
    pub const ALL: [ShapeType; 5] = [
        ShapeType::Null,
        ShapeType::Point,
        ShapeType::PolyLine,
        ShapeType::Polygon,
        ShapeType::MultiPoint,
    ];

    /// Map a raw code to a shape type.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Null),
            1 => Ok(Self::Point),
            3 => Ok(Self::PolyLine),
            5 => Ok(Self::Polygon),
            8 => Ok(Self::MultiPoint),
            other => Err(ShapefileError::ShapeTypeNotSupported(i64::from(other))),
        }
    }

    /// Raw code
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Canonical name as used by the format documentation
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Point => "Point",
            Self::PolyLine => "PolyLine",
            Self::Polygon => "Polygon",
            Self::MultiPoint => "MultiPoint",
        }
    }

    /// Records of this type may be stored in a file of type `file_type`.
    ///
    /// Null records mark absent geometry in a file of any type.
    pub fn fits_file(self, file_type: ShapeType) -> bool {
        self == ShapeType::Null || self == file_type
    }
}

impl FromStr for ShapeType {
    type Err = ShapefileError;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(code) = s.trim().parse::<i64>() {
            return u32::try_from(code)
                .map_err(|_| ShapefileError::ShapeTypeNotSupported(code))
                .and_then(Self::from_code);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(ShapefileError::ShapeTypeNotSupported(-1))
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
