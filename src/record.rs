//! Listing records as handed to the classifier.
//!
//! A record is an ordered bag of fields. Only three of them matter for
//! classification (name, price, area); everything else is carried through
//! untouched so output keeps the input's columns and their order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// A single input row, field order preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingRecord {
    fields: IndexMap<String, Value>,
}

impl ListingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: IndexMap<String, Value>) -> Self {
        Self { fields }
    }

    /// Builder-style setter, mostly handy for tests and the collector.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the field rendered as text. Missing and null fields are empty.
    pub fn text(&self, key: &str) -> Cow<'_, str> {
        match self.fields.get(key) {
            Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
            Some(Value::Null) | None => Cow::Borrowed(""),
            Some(other) => Cow::Owned(other.to_string()),
        }
    }

    /// Returns the field as a number, or `None` when it is missing or malformed.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(number_from_value)
    }
}

/// Reads a JSON value as a finite number.
///
/// Strings are accepted when they parse after trimming and dropping
/// thousands separators (`"12,500"`).
pub fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Parses a plain decimal string. Returns `None` for anything non-numeric.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Which record fields hold the classifier inputs, and where the labels go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub name: String,
    pub price: String,
    pub area: String,
    pub village_label: String,
    pub price_label: String,
    pub size_label: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            name: "단지명".to_string(),
            price: "중간매매가(만원)".to_string(),
            area: "대표면적(㎡)".to_string(),
            village_label: "마을분류".to_string(),
            price_label: "가격구간".to_string(),
            size_label: "평형구간".to_string(),
        }
    }
}

impl FieldNames {
    /// The three label columns, in the order they are appended.
    pub fn label_fields(&self) -> [&str; 3] {
        [&self.village_label, &self.price_label, &self.size_label]
    }
}
