//! Listing classification and aggregation.
//!
//! Each complex gets a village (keyword match on its name), a price band and
//! a size band (half-open interval lookup). Labeled records are then folded
//! into per-village and per-band statistics. Everything here is pure and
//! synchronous; the rule tables are built once and only borrowed.

pub mod aggregate;
pub mod band;
pub mod rules;
pub mod schema;
pub mod types;
pub mod utility;
pub mod village;

pub use aggregate::{Aggregator, process, process_sharded};
pub use rules::{Band, ClassificationRuleSet, KeywordRule, OverrideRule, RulesConfig};
pub use schema::RuleSchema;
pub use types::{AggregationResult, AggregationSummary, LabeledRecord, VillageSummary};
