//! Decoding of listing records and listing-site price strings.

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

use crate::record::{ListingRecord, parse_number};

/// Whether `path` names a gzip file (`.gz`, any case).
pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Input formats the classifier accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Csv,
    Json,
}

impl RecordFormat {
    /// Picks the format from a file extension, looking through a trailing `.gz`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        if name.ends_with(".csv") {
            Some(RecordFormat::Csv)
        } else if name.ends_with(".json") {
            Some(RecordFormat::Json)
        } else {
            None
        }
    }
}

/// Reads CSV rows as records. Header names become field names; empty cells
/// become null, every other cell stays a string.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<ListingRecord>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        // files written by spreadsheet tools often start with a BOM
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let mut fields = IndexMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = match row.get(i) {
                Some(cell) if !cell.is_empty() => Value::String(cell.to_string()),
                _ => Value::Null,
            };
            fields.insert(header.clone(), value);
        }
        records.push(ListingRecord::from_fields(fields));
    }
    Ok(records)
}

/// Reads a JSON array of objects as records. Non-object entries are kept as
/// empty records so the batch size matches the input.
pub fn parse_json(bytes: &[u8]) -> Result<Vec<ListingRecord>> {
    let values: Vec<Value> = serde_json::from_slice(bytes).context("expected a JSON array")?;
    Ok(values
        .into_iter()
        .map(|value| serde_json::from_value(value).unwrap_or_default())
        .collect())
}

/// Loads records from a `.csv` or `.json` file (optionally gzipped).
pub fn read_records(path: &Path) -> Result<Vec<ListingRecord>> {
    let Some(format) = RecordFormat::from_path(path) else {
        bail!("unsupported input format: {}", path.display());
    };

    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut bytes = Vec::new();
    if is_gzip(path) {
        flate2::read::GzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        std::io::BufReader::new(file).read_to_end(&mut bytes)?;
    }

    match format {
        RecordFormat::Csv => parse_csv(bytes.as_slice()),
        RecordFormat::Json => parse_json(&bytes),
    }
}

/// Parses a listing price written the Korean way into 만원.
///
/// `"5억 2,000"` is 52000, `"3억"` is 30000, `"9,800"` is 9800. Returns
/// `None` for anything that does not follow that shape.
pub fn parse_korean_price(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (eok, rest) = match raw.split_once('억') {
        Some((eok, rest)) => (parse_number(eok)?, rest.trim()),
        None => (0.0, raw),
    };
    let man = if rest.is_empty() {
        0.0
    } else {
        parse_number(rest.trim_end_matches("만원").trim_end_matches('만'))?
    };

    let total = eok * 10000.0 + man;
    (total.is_finite() && total >= 0.0).then_some(total)
}
