//! Diagnostic: print the header, every record and the read notifications of
//! a shapefile.
//!
//! Usage: `shp_dump <file.shp>`. Set `RUST_LOG=shptools=debug` for library
//! logs.

use std::fs::File;
use std::io::BufReader;

use anyhow::{bail, Context, Result};
use shptools::io::shp::{read_index, ShpStreamReader};
use shptools::error::FileKind;
use shptools::{AttributeValue, Attributes, Shapefile};

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn format_attributes(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|(name, value)| match value {
            AttributeValue::Text(s) => format!("{name}=\"{s}\""),
            other => format!("{name}={other}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() -> Result<()> {
    init_tracing();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: shp_dump <file.shp>");
    };

    let mut session = Shapefile::new(&path);
    let shape_type = session
        .shape_type()
        .with_context(|| format!("failed to open {path}"))?;
    let bbox = session.bounding_box()?;
    println!("file:       {}", session.paths().shp.display());
    println!("shape type: {shape_type} ({})", shape_type.code());
    println!("bbox:       {bbox}");

    let shx = session.paths().shx.clone();
    match File::open(&shx) {
        Ok(file) => {
            let mut index = ShpStreamReader::new(BufReader::new(file), FileKind::Shx)?;
            let (_, entries) = read_index(&mut index).with_context(|| format!("failed to read {}", shx.display()))?;
            println!("index:      {} entries", entries.len());
        }
        Err(e) => println!("index:      unavailable ({e})"),
    }
    println!();

    let mut count = 0usize;
    for record in session.records()? {
        let record = record.with_context(|| format!("failed after {count} records"))?;
        let wkt = record.to_wkt().unwrap_or_else(|| "NULL".to_string());
        println!("#{} {} {}", record.record_number, wkt, format_attributes(&record.attributes));
        count += 1;
    }

    println!();
    println!("{count} records");
    if let Some(notifications) = session.notifications() {
        for notification in notifications {
            println!("{notification}");
        }
    }
    session.close();
    Ok(())
}
