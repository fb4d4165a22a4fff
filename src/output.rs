//! Output formatting and persistence for labeled records, summaries and the
//! rule schema.
//!
//! Supports CSV and JSON (gzipped when the path ends in `.gz`), CSV append,
//! and a log rendering of the village table.

use anyhow::{Context, Result, bail};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::classify::schema::RuleSchema;
use crate::classify::types::{AggregationSummary, LabeledRecord};
use crate::parser::{RecordFormat, is_gzip};
use crate::record::{FieldNames, ListingRecord};

/// Export format of the rule schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchemaFormat {
    Json,
    Js,
}

/// An output file, gzipped or not. Must be closed with
/// [`finish`](Self::finish); dropping a gzip stream hides trailer write errors.
enum OutputFile {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputFile {
    /// Opens `path` for writing, creating parent directories and wrapping the
    /// file in a gzip encoder when the name ends in `.gz`.
    fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let writer = BufWriter::new(file);

        if is_gzip(path) {
            Ok(OutputFile::Gzip(GzEncoder::new(writer, Compression::default())))
        } else {
            Ok(OutputFile::Plain(writer))
        }
    }

    /// Writes the gzip trailer if any and flushes everything to disk.
    fn finish(self) -> Result<()> {
        let mut file = match self {
            OutputFile::Plain(writer) => writer,
            OutputFile::Gzip(encoder) => encoder.finish()?,
        };
        file.flush()?;
        Ok(())
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            OutputFile::Plain(w) => w.write(buf),
            OutputFile::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            OutputFile::Plain(w) => w.flush(),
            OutputFile::Gzip(w) => w.flush(),
        }
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Writes rows of fields as CSV.
///
/// The header is the union of all columns in first-seen order, with the
/// `last` columns moved to the end.
fn write_fields_csv<W: Write>(writer: &mut W, rows: &[IndexMap<String, Value>], last: &[&str]) -> Result<()> {
    let mut header: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !last.contains(&key.as_str()) && !header.contains(&key.as_str()) {
                header.push(key);
            }
        }
    }
    header.extend(last);

    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(&header)?;
    for row in rows {
        wtr.write_record(header.iter().map(|key| cell(row.get(*key))))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes labeled records as CSV with the three label columns last.
pub fn write_records_csv<W: Write>(writer: &mut W, records: &[LabeledRecord], names: &FieldNames) -> Result<()> {
    let rows: Vec<_> = records.iter().map(|r| r.to_fields(names)).collect();
    write_fields_csv(writer, &rows, &names.label_fields())
}

/// Writes unlabeled records as CSV, e.g. the classifier input built from a
/// collection run.
pub fn write_listing_csv(path: &Path, records: &[ListingRecord]) -> Result<()> {
    let rows: Vec<_> = records.iter().map(|r| r.fields().clone()).collect();
    let mut file = OutputFile::create(path)?;
    write_fields_csv(&mut file, &rows, &[])?;
    file.finish()
}

/// Writes labeled records as a pretty JSON array.
pub fn write_records_json<W: Write>(writer: &mut W, records: &[LabeledRecord], names: &FieldNames) -> Result<()> {
    let rows: Vec<_> = records.iter().map(|r| r.to_fields(names)).collect();
    serde_json::to_writer_pretty(&mut *writer, &rows)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes labeled records to `path`, picking CSV or JSON from its extension.
pub fn write_records(path: &Path, records: &[LabeledRecord], names: &FieldNames) -> Result<()> {
    let Some(format) = RecordFormat::from_path(path) else {
        bail!("unsupported output format: {}", path.display());
    };
    debug!(path = %path.display(), records = records.len(), ?format, "Writing labeled records");

    let mut file = OutputFile::create(path)?;
    match format {
        RecordFormat::Csv => write_records_csv(&mut file, records, names)?,
        RecordFormat::Json => write_records_json(&mut file, records, names)?,
    }
    file.finish()
}

/// Writes any serializable value as pretty JSON.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let mut file = OutputFile::create(path)?;
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    file.finish()
}

pub fn write_summary(path: &Path, summary: &AggregationSummary) -> Result<()> {
    write_json(path, summary)
}

pub fn write_schema(path: &Path, schema: &RuleSchema, format: SchemaFormat) -> Result<()> {
    let body = match format {
        SchemaFormat::Json => schema.to_json()?,
        SchemaFormat::Js => schema.to_js_module()?,
    };
    let mut file = OutputFile::create(path)?;
    file.write_all(body.as_bytes())?;
    file.finish()
}

/// Writes serializable rows as a fresh CSV file with a header.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut file = OutputFile::create(path)?;
    let mut wtr = WriterBuilder::new().from_writer(&mut file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    drop(wtr);
    file.finish()
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: &str, record: &T) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Logs the village table, most expensive village first, then the price
/// band distribution.
pub fn log_summary(summary: &AggregationSummary) {
    info!(total = summary.total_count, "Classification summary");

    for (village, stats) in summary.villages_by_mean_price() {
        info!(
            village,
            complexes = stats.count,
            priced = stats.priced_count,
            mean = %stats.mean_price.map(|p| format!("{p:.0}")).unwrap_or_default(),
            min = %stats.min_price.map(|p| format!("{p:.0}")).unwrap_or_default(),
            max = %stats.max_price.map(|p| format!("{p:.0}")).unwrap_or_default(),
            share = %format!("{:.1}%", stats.percentage),
            "Village"
        );
    }

    for (band, count) in &summary.price_distribution {
        info!(band = %band, count, "Price band");
    }
}
