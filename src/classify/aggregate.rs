use crate::classify::rules::ClassificationRuleSet;
use crate::classify::types::{AggregationResult, AggregationSummary, LabeledRecord, VillageSummary};
use crate::classify::utility::{RunningStats, pct};
use crate::record::ListingRecord;
use indexmap::IndexMap;
use tracing::{debug, trace};

impl ClassificationRuleSet {
    /// Attaches village, price band and size band labels to a record.
    ///
    /// Missing or malformed fields never fail: they map to the fallback and
    /// unknown labels.
    pub fn label(&self, record: ListingRecord) -> LabeledRecord {
        let fields = self.fields();
        let village = self.classify_village(&record.text(&fields.name)).to_string();
        let price_band = self.classify_price(record.number(&fields.price)).to_string();
        let size_band = self.classify_size(record.number(&fields.area)).to_string();

        trace!(village = %village, price_band = %price_band, size_band = %size_band, "Record labeled");

        LabeledRecord {
            record,
            village,
            price_band,
            size_band,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct VillageTally {
    records: usize,
    prices: RunningStats,
}

/// Partial aggregation state.
///
/// Shards of a batch can be folded independently and combined with
/// [`merge`](Self::merge); the result does not depend on how the input was
/// split or in which order shards are merged.
#[derive(Debug, Clone)]
pub struct Aggregator<'r> {
    rules: &'r ClassificationRuleSet,
    villages: IndexMap<String, VillageTally>,
    price_bands: IndexMap<String, usize>,
    size_bands: IndexMap<String, usize>,
    total: usize,
}

impl<'r> Aggregator<'r> {
    pub fn new(rules: &'r ClassificationRuleSet) -> Self {
        Self {
            rules,
            villages: IndexMap::new(),
            price_bands: IndexMap::new(),
            size_bands: IndexMap::new(),
            total: 0,
        }
    }

    /// Counts one labeled record.
    pub fn observe(&mut self, labeled: &LabeledRecord) {
        self.total += 1;

        let tally = self.villages.entry(labeled.village.clone()).or_default();
        tally.records += 1;

        let price = labeled.record.number(&self.rules.fields().price);
        if let Some(price) = price.filter(|p| self.rules.price_band(Some(*p)).is_some()) {
            tally.prices.push(price);
        }

        *self.price_bands.entry(labeled.price_band.clone()).or_default() += 1;
        *self.size_bands.entry(labeled.size_band.clone()).or_default() += 1;
    }

    /// Labels a record, counts it and hands the labeled record back.
    pub fn push(&mut self, record: ListingRecord) -> LabeledRecord {
        let labeled = self.rules.label(record);
        self.observe(&labeled);
        labeled
    }

    pub fn merge(&mut self, other: Aggregator<'_>) {
        self.total += other.total;
        for (village, tally) in other.villages {
            let mine = self.villages.entry(village).or_default();
            mine.records += tally.records;
            mine.prices.merge(tally.prices);
        }
        for (band, count) in other.price_bands {
            *self.price_bands.entry(band).or_default() += count;
        }
        for (band, count) in other.size_bands {
            *self.size_bands.entry(band).or_default() += count;
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Final statistics, keyed in rule-table order with the fallback and
    /// unknown labels last.
    pub fn finish(&self) -> AggregationSummary {
        let village_summary = self
            .rules
            .village_labels()
            .into_iter()
            .filter_map(|label| {
                self.villages.get(label).map(|tally| {
                    let summary = VillageSummary {
                        count: tally.records,
                        priced_count: tally.prices.count(),
                        mean_price: tally.prices.mean(),
                        min_price: tally.prices.min(),
                        max_price: tally.prices.max(),
                        percentage: pct(tally.records, self.total),
                    };
                    (label.to_string(), summary)
                })
            })
            .collect();

        let unknown = self.rules.unknown_label();
        let price_distribution = ordered_counts(
            self.rules.price_bands().iter().map(|b| b.label.as_str()).chain([unknown]),
            &self.price_bands,
        );
        let size_distribution = ordered_counts(
            self.rules.size_bands().iter().map(|b| b.label.as_str()).chain([unknown]),
            &self.size_bands,
        );

        AggregationSummary {
            total_count: self.total,
            village_summary,
            price_distribution,
            size_distribution,
        }
    }
}

fn ordered_counts<'a>(
    labels: impl Iterator<Item = &'a str>,
    counts: &IndexMap<String, usize>,
) -> IndexMap<String, usize> {
    labels
        .filter_map(|label| counts.get(label).map(|count| (label.to_string(), *count)))
        .collect()
}

/// Classifies every record and computes the grouped statistics.
pub fn process<I>(rules: &ClassificationRuleSet, records: I) -> AggregationResult
where
    I: IntoIterator<Item = ListingRecord>,
{
    let mut aggregator = Aggregator::new(rules);
    let records: Vec<LabeledRecord> = records
        .into_iter()
        .map(|record| aggregator.push(record))
        .collect();
    let summary = aggregator.finish();

    debug!(
        total = summary.total_count,
        villages = summary.village_summary.len(),
        "Batch aggregated"
    );

    AggregationResult { records, summary }
}

/// Like [`process`], but labels `shards` chunks on scoped threads and merges
/// the partial summaries.
pub fn process_sharded(
    rules: &ClassificationRuleSet,
    records: Vec<ListingRecord>,
    shards: usize,
) -> AggregationResult {
    let chunk_size = records.len().div_ceil(shards.max(1)).max(1);
    let mut chunks: Vec<Vec<ListingRecord>> = Vec::new();
    let mut iter = records.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(chunk_size).collect());
    }

    let partials: Vec<(Vec<LabeledRecord>, Aggregator<'_>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .into_iter()
            .map(|chunk| {
                scope.spawn(move || {
                    let mut aggregator = Aggregator::new(rules);
                    let labeled: Vec<_> = chunk.into_iter().map(|r| aggregator.push(r)).collect();
                    (labeled, aggregator)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(partial) => partial,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut merged = Aggregator::new(rules);
    let mut labeled = Vec::new();
    for (records, aggregator) in partials {
        labeled.extend(records);
        merged.merge(aggregator);
    }

    debug!(total = merged.total(), shards, "Sharded batch aggregated");

    AggregationResult {
        records: labeled,
        summary: merged.finish(),
    }
}
