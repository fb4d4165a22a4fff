//! Data types produced by the classification pipeline.

use crate::record::{FieldNames, ListingRecord};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A listing plus its three labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub record: ListingRecord,
    pub village: String,
    pub price_band: String,
    pub size_band: String,
}

impl LabeledRecord {
    /// Original fields in their original order, label fields appended last.
    ///
    /// A label column already present in the input (re-classifying earlier
    /// output) is moved to the end and overwritten.
    pub fn to_fields(&self, names: &FieldNames) -> IndexMap<String, Value> {
        let mut fields = self.record.fields().clone();
        for (key, label) in [
            (&names.village_label, &self.village),
            (&names.price_label, &self.price_band),
            (&names.size_label, &self.size_band),
        ] {
            fields.shift_remove(key.as_str());
            fields.insert(key.clone(), Value::String(label.clone()));
        }
        fields
    }
}

/// Per-village price statistics.
///
/// `count` covers every record in the village; the price figures only the
/// `priced_count` records that had a usable price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VillageSummary {
    pub count: usize,
    pub priced_count: usize,
    pub mean_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Share of all records, in percent.
    pub percentage: f64,
}

/// Grouped statistics for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationSummary {
    pub total_count: usize,
    pub village_summary: IndexMap<String, VillageSummary>,
    /// Records per price band, unknown included as its own entry.
    pub price_distribution: IndexMap<String, usize>,
    /// Records per size band, unknown included as its own entry.
    pub size_distribution: IndexMap<String, usize>,
}

impl AggregationSummary {
    /// Villages sorted by mean price, most expensive first. Villages without
    /// any priced record go last.
    pub fn villages_by_mean_price(&self) -> Vec<(&str, &VillageSummary)> {
        let mut villages: Vec<_> = self
            .village_summary
            .iter()
            .map(|(name, summary)| (name.as_str(), summary))
            .collect();
        villages.sort_by(|(_, a), (_, b)| match (a.mean_price, b.mean_price) {
            (Some(a), Some(b)) => b.total_cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        villages
    }
}

/// Everything [`process`](crate::classify::aggregate::process) returns.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub records: Vec<LabeledRecord>,
    pub summary: AggregationSummary,
}

impl AggregationResult {
    pub fn total_count(&self) -> usize {
        self.summary.total_count
    }
}
