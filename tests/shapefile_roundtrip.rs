//! Write shapefiles to `test_output/` through a session and read them back.

mod common;

use common::*;
use shptools::attributes::{default_attributes, AttributeError};
use shptools::error::{ModeConflict, ShapefileError};
use shptools::io::shp::{MultiPointLength, SessionState};
use shptools::{
    AttributeValue, Attributes, BoundingBox, FieldDescriptor, FieldKind, Geometry, MultiPoint, Point, Polygon,
    PolygonGeometry, Polyline, Schema, ShapeType, Shapefile, ShapefileWriterConfiguration,
};

fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

#[test]
fn test_three_points_round_trip() {
    let mut session = fresh_session("three_points");
    for (x, y) in [(3.0, 4.0), (15.0, 15.0), (-25.0, 15.0)] {
        session.add_point(Point::new(x, y)).unwrap();
    }
    session.write().unwrap();
    assert!(matches!(session.state(), SessionState::Unset));

    assert_eq!(session.shape_type().unwrap(), ShapeType::Point);
    assert_eq!(session.bounding_box().unwrap(), BoundingBox::new(-25.0, 4.0, 15.0, 15.0));

    let mut records = Vec::new();
    while let Some(record) = session.read_record().unwrap() {
        records.push(record);
    }
    assert_eq!(records.len(), 3);
    for (i, (record, (x, y))) in records.iter().zip([(3.0, 4.0), (15.0, 15.0), (-25.0, 15.0)]).enumerate() {
        let number = i as u32 + 1;
        assert_eq!(record.record_number, number);
        assert_eq!(record.geometry, Geometry::Point(Point::new(x, y)));
        assert_eq!(record.attributes, default_attributes(number));
    }
    assert!(session.notifications().unwrap().is_empty());
    assert_eq!(records[0].to_wkt().as_deref(), Some("POINT(3 4)"));
}

#[test]
fn test_header_bytes_match_layout() {
    let mut session = fresh_session("header_layout");
    session.add_point(Point::new(1.0, 2.0)).unwrap();
    session.add_point(Point::new(5.0, -3.0)).unwrap();
    session.write().unwrap();

    let shp = std::fs::read(&session.paths().shp).unwrap();
    assert_eq!(be_u32(&shp, 0), 9994);
    assert_eq!(be_u32(&shp, 24) as usize * 2, shp.len());
    assert_eq!(le_u32(&shp, 28), 1000);
    assert_eq!(le_u32(&shp, 32), 1);
    assert_eq!(
        [le_f64(&shp, 36), le_f64(&shp, 44), le_f64(&shp, 52), le_f64(&shp, 60)],
        [1.0, -3.0, 5.0, 2.0]
    );
}

// ---------------------------------------------------------------------------
// Multi-point shapes
// ---------------------------------------------------------------------------

#[test]
fn test_multipoint_round_trip() {
    let mut session = fresh_session("multipoint");
    let first = pts(&[(3.0, 4.0), (15.0, 15.0), (-25.0, 13.0)]);
    let second = pts(&[(0.5, 0.25)]);
    session.add_multipoint(first.clone()).unwrap();
    session.add_multipoint(second.clone()).unwrap();
    session.write().unwrap();

    let records = read_all("multipoint");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].geometry, Geometry::MultiPoint(MultiPoint::new(first)));
    assert_eq!(records[1].geometry, Geometry::MultiPoint(MultiPoint::new(second)));
    assert_eq!(records[1].to_wkt().as_deref(), Some("MULTIPOINT(0.5 0.25)"));
}

#[test]
fn test_polyline_round_trip() {
    let mut session = fresh_session("polyline");
    let parts = vec![pts(&[(1.0, 1.0), (4.0, 16.0), (9.0, 81.0)]), pts(&[(-1.0, 1.0), (-6.0, 36.0)])];
    session.add_polyline(parts.clone()).unwrap();
    session.add_polyline(vec![pts(&[(0.0, 0.0), (1.0, 1.0)])]).unwrap();
    session.write().unwrap();

    let records = read_all("polyline");
    assert_eq!(records[0].geometry, Geometry::Polyline(Polyline::new(parts)));
    assert_eq!(records[1].to_wkt().as_deref(), Some("LINESTRING(0 0, 1 1)"));
    assert!(records[0].to_wkt().unwrap().starts_with("MULTILINESTRING(("));
}

#[test]
fn test_polygons_with_holes_round_trip() {
    let mut session = fresh_session("polygons");
    let polygons = vec![
        Polygon::new(square_cw(0.0, 0.0, 10.0, 10.0), vec![square_ccw(2.0, 2.0, 4.0, 4.0)]),
        Polygon::new(
            square_cw(20.0, 20.0, 30.0, 30.0),
            vec![square_ccw(21.0, 21.0, 22.0, 22.0), square_ccw(25.0, 25.0, 27.0, 27.0)],
        ),
    ];
    session.add_polygon(polygons.clone()).unwrap();
    session
        .add_polygon(vec![Polygon::new(square_cw(-5.0, -5.0, -1.0, -1.0), vec![])])
        .unwrap();
    session.write().unwrap();

    assert_eq!(
        Shapefile::new(test_output_path("polygons.shp")).bounding_box().unwrap(),
        BoundingBox::new(-5.0, -5.0, 30.0, 30.0)
    );

    let records = read_all("polygons");
    let Geometry::Polygon(first) = &records[0].geometry else {
        panic!("expected a polygon record");
    };
    assert_eq!(first, &PolygonGeometry::new(polygons));
    assert_eq!(first.polygons[1].holes().len(), 2);
    assert!(records[0].to_wkt().unwrap().starts_with("MULTIPOLYGON((("));
    assert!(records[1].to_wkt().unwrap().starts_with("POLYGON(("));
}

#[test]
fn test_null_records_in_typed_file() {
    let mut session = fresh_session("null_mixed");
    session.add_null().unwrap();
    session.add_polyline(vec![pts(&[(0.0, 0.0), (2.0, 2.0)])]).unwrap();
    session.add_null().unwrap();
    session.write().unwrap();

    let records = read_all("null_mixed");
    assert_eq!(records.len(), 3);
    assert!(records[0].geometry.is_null());
    assert!(records[0].to_wkt().is_none());
    assert_eq!(records[1].geometry.shape_type(), ShapeType::PolyLine);
    assert_eq!(records[2].record_number, 3);
}

#[test]
fn test_null_file_has_zero_bbox() {
    let mut session = fresh_session("null_only");
    session.set_shape_type(ShapeType::Null).unwrap();
    session.add_null().unwrap();
    session.add_null().unwrap();
    session.write().unwrap();

    assert_eq!(session.shape_type().unwrap(), ShapeType::Null);
    assert_eq!(session.bounding_box().unwrap(), BoundingBox::zero());
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[test]
fn test_index_entries_track_records() {
    let mut session = fresh_session("index");
    session.add_polyline(vec![pts(&[(0.0, 0.0), (1.0, 1.0)])]).unwrap();
    session.add_null().unwrap();
    session
        .add_polyline(vec![pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]), pts(&[(5.0, 5.0), (6.0, 6.0)])])
        .unwrap();
    session.write().unwrap();

    let shx = std::fs::read(&session.paths().shx).unwrap();
    let shp = std::fs::read(&session.paths().shp).unwrap();
    assert_eq!(shx.len(), 100 + 3 * 8);
    assert_eq!(be_u32(&shx, 24), 62);

    let mut expected_offset = 50;
    for i in 0..3 {
        let offset = be_u32(&shx, 100 + i * 8);
        let length = be_u32(&shx, 104 + i * 8);
        assert_eq!(offset, expected_offset);
        // each entry points at its record header
        let at = offset as usize * 2;
        assert_eq!(be_u32(&shp, at), i as u32 + 1);
        assert_eq!(be_u32(&shp, at + 4), length);
        expected_offset += length + 4;
    }
    assert_eq!(expected_offset as usize * 2, shp.len());
}

fn write_multipoints(name: &str, multipoint_length: MultiPointLength) -> (Vec<u8>, Vec<u8>) {
    let mut session = fresh_session(name).with_writer_configuration(ShapefileWriterConfiguration {
        multipoint_length,
        ..Default::default()
    });
    session.add_multipoint(pts(&[(1.0, 1.0)])).unwrap();
    session.add_multipoint(pts(&[(3.0, 4.0), (15.0, 15.0), (-25.0, 13.0)])).unwrap();
    session.add_multipoint(pts(&[(0.0, 0.0), (2.0, 2.0)])).unwrap();
    session.write().unwrap();

    let records = read_all(name);
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].geometry, Geometry::MultiPoint(MultiPoint::new(pts(&[(3.0, 4.0), (15.0, 15.0), (-25.0, 13.0)]))));

    (
        std::fs::read(&session.paths().shp).unwrap(),
        std::fs::read(&session.paths().shx).unwrap(),
    )
}

#[test]
fn test_multipoint_index_uses_legacy_lengths() {
    let (shp, shx) = write_multipoints("multipoint_index_legacy", MultiPointLength::Legacy);

    // records hold 1, 3 and 2 points: 24 + 8n words each
    let lengths = [32, 48, 40];
    let offsets = [50, 50 + 32 + 4, 50 + 32 + 4 + 48 + 4];
    assert_eq!(shx.len(), 100 + 3 * 8);
    for i in 0..3 {
        assert_eq!(be_u32(&shx, 100 + i * 8), offsets[i]);
        assert_eq!(be_u32(&shx, 104 + i * 8), lengths[i]);
    }

    // the geometry file records the same lengths, while its header length
    // counts the bytes actually written
    assert_eq!(be_u32(&shp, 104), 32);
    assert_eq!(be_u32(&shp, 24) as usize * 2, shp.len());
    assert_eq!(shp.len(), 100 + (8 + 40 + 16) + (8 + 40 + 48) + (8 + 40 + 32));
}

#[test]
fn test_multipoint_index_exact_lengths_point_at_records() {
    let (shp, shx) = write_multipoints("multipoint_index_exact", MultiPointLength::Exact);

    let mut expected_offset = 50;
    for i in 0..3 {
        let offset = be_u32(&shx, 100 + i * 8);
        let length = be_u32(&shx, 104 + i * 8);
        assert_eq!(offset, expected_offset);
        assert_eq!(be_u32(&shp, offset as usize * 2), i as u32 + 1);
        expected_offset += length + 4;
    }
    assert_eq!(expected_offset as usize * 2, shp.len());
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

fn city_schema() -> Schema {
    Schema::new(vec![
        FieldDescriptor::new("id", FieldKind::Integer),
        FieldDescriptor::with_size("name", FieldKind::Text, 20, 0),
        FieldDescriptor::with_size("pop", FieldKind::Real, 12, 1),
        FieldDescriptor::new("capital", FieldKind::Boolean),
    ])
}

#[test]
fn test_attributes_round_trip_with_code_page() {
    let mut session = fresh_session("cities");
    session.set_schema(city_schema()).unwrap();
    session
        .add_point_with_attributes(
            Point::new(8.54, 47.37),
            attrs(&[
                ("id", AttributeValue::Integer(1)),
                ("name", AttributeValue::from("Zürich")),
                ("pop", AttributeValue::Real(421878.0)),
                ("capital", AttributeValue::Boolean(false)),
            ]),
        )
        .unwrap();
    session.add_point(Point::new(7.45, 46.95)).unwrap();
    session
        .set_attributes(attrs(&[
            ("id", AttributeValue::Integer(2)),
            ("name", AttributeValue::from("Bern")),
            ("capital", AttributeValue::Boolean(true)),
        ]))
        .unwrap();
    session.write().unwrap();

    assert_eq!(std::fs::read_to_string(&session.paths().cpg).unwrap(), "UTF-8");

    let records = read_all("cities");
    assert_eq!(records[0].attributes["name"], AttributeValue::from("Zürich"));
    assert_eq!(records[0].attributes["pop"], AttributeValue::Real(421878.0));
    assert_eq!(records[0].attributes["capital"], AttributeValue::Boolean(false));
    assert_eq!(records[1].attributes["id"], AttributeValue::Integer(2));
    assert_eq!(records[1].attributes["pop"], AttributeValue::Null);
    assert_eq!(records[1].attributes["capital"], AttributeValue::Boolean(true));
}

#[test]
fn test_validation_failure_writes_nothing() {
    let mut session = fresh_session("invalid_attributes");
    session.set_schema(city_schema()).unwrap();
    session
        .add_point_with_attributes(Point::new(0.0, 0.0), attrs(&[("population", AttributeValue::Integer(3))]))
        .unwrap();
    session
        .add_point_with_attributes(Point::new(1.0, 1.0), attrs(&[("name", AttributeValue::Integer(3))]))
        .unwrap();

    let err = session.write().unwrap_err();
    assert!(matches!(err, ShapefileError::AttributeValidationFailed(ref errors) if errors.len() == 2));
    assert_eq!(session.errors().len(), 2);
    assert!(!session.paths().shp.exists());
    assert!(!session.paths().shx.exists());
    assert!(!session.paths().dbf.exists());

    // the buffer survives; fixing the last record is not enough
    session.set_attributes(attrs(&[("name", AttributeValue::from("ok"))])).unwrap();
    assert!(session.write().is_err());
    assert_eq!(session.errors().len(), 1);
    assert_eq!(session.errors()[0].record(), 1);
}

#[test]
fn test_text_checked_against_table_encoding() {
    let mut session = fresh_session("text_limits").with_writer_configuration(ShapefileWriterConfiguration {
        encoding: encoding_rs::WINDOWS_1252,
        ..Default::default()
    });
    session
        .set_schema(Schema::new(vec![FieldDescriptor::with_size("name", FieldKind::Text, 5, 0)]))
        .unwrap();
    session
        .add_point_with_attributes(Point::new(0.0, 0.0), attrs(&[("name", AttributeValue::from("abcdefghij"))]))
        .unwrap();
    session
        .add_point_with_attributes(Point::new(1.0, 1.0), attrs(&[("name", AttributeValue::from("日本"))]))
        .unwrap();
    session
        .add_point_with_attributes(Point::new(2.0, 2.0), attrs(&[("name", AttributeValue::from("café"))]))
        .unwrap();

    assert!(session.write().is_err());
    assert!(matches!(
        session.errors(),
        [
            AttributeError::ValueTooWide { record: 1, width: 5, .. },
            AttributeError::Unmappable { record: 2, .. },
        ]
    ));
    assert!(!session.paths().dbf.exists());

    // what is left fits once encoded
    session.close();
    session
        .set_schema(Schema::new(vec![FieldDescriptor::with_size("name", FieldKind::Text, 5, 0)]))
        .unwrap();
    session
        .add_point_with_attributes(Point::new(2.0, 2.0), attrs(&[("name", AttributeValue::from("café"))]))
        .unwrap();
    session.write().unwrap();
    assert_eq!(read_all("text_limits")[0].attributes["name"], AttributeValue::from("café"));
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[test]
fn test_write_while_reading_conflicts() {
    let mut session = fresh_session("conflict");
    session.add_point(Point::new(0.0, 0.0)).unwrap();
    session.write().unwrap();

    assert!(session.read_record().unwrap().is_some());
    let err = session.add_point(Point::new(1.0, 1.0)).unwrap_err();
    assert!(matches!(err, ShapefileError::ModeConflict(ModeConflict::WriteWhileReading)));
    assert_eq!(err.code(), 19);
    assert!(session.write().is_err());

    session.close();
    session.add_point(Point::new(2.0, 2.0)).unwrap();
    session.write().unwrap();
    let records = read_all("conflict");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].geometry, Geometry::Point(Point::new(2.0, 2.0)));
}

#[test]
fn test_mixed_shape_types_rejected() {
    let mut session = fresh_session("mixed_types");
    session.add_point(Point::new(0.0, 0.0)).unwrap();
    let err = session.add_multipoint(pts(&[(1.0, 1.0)])).unwrap_err();
    assert!(matches!(
        err,
        ShapefileError::WrongRecordType {
            expected: ShapeType::Point,
            found: ShapeType::MultiPoint
        }
    ));
    assert_eq!(err.code(), 22);
}

#[test]
fn test_empty_session_writes_empty_file() {
    let mut session = fresh_session("empty");
    session.write().unwrap();
    let shp = std::fs::read(&session.paths().shp).unwrap();
    assert_eq!(shp.len(), 100);
    assert!(read_all("empty").is_empty());
}
