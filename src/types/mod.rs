//! Value types shared by the geometry model and the binary codecs

mod bounds;
mod point;
mod shape_type;

pub use bounds::BoundingBox;
pub use point::Point;
pub use shape_type::ShapeType;
