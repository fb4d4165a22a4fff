//! Static dump of the rule tables for the report front-end.
//!
//! Pure data: the same keyword table, band edges and labels the classifier
//! uses, with no logic attached.

use crate::classify::rules::{Band, ClassificationRuleSet};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeEntry {
    pub min: f64,
    /// `None` for the open-ended last band.
    pub max: Option<f64>,
    pub name: String,
}

impl RangeEntry {
    fn from_bands(bands: &[Band]) -> Vec<Self> {
        let last = bands.len().saturating_sub(1);
        bands
            .iter()
            .enumerate()
            .map(|(i, band)| RangeEntry {
                min: band.lower,
                max: if i == last { None } else { band.upper },
                name: band.label.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverrideEntry {
    pub contains: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSchema {
    /// Keyword to village, in match order.
    pub village_keywords: IndexMap<String, String>,
    pub overrides: Vec<OverrideEntry>,
    pub patterns: IndexMap<String, String>,
    /// Every village label, fallback last.
    pub villages: Vec<String>,
    pub fallback_label: String,
    pub unknown_label: String,
    /// Thresholds in 만원.
    pub price_ranges: Vec<RangeEntry>,
    /// Thresholds in 평; raw area is divided by `area_divisor` first.
    pub area_types: Vec<RangeEntry>,
    pub area_divisor: f64,
}

impl RuleSchema {
    pub fn from_rules(rules: &ClassificationRuleSet) -> Self {
        // first occurrence wins, same as the classifier
        let mut village_keywords = IndexMap::new();
        for rule in rules.villages() {
            village_keywords
                .entry(rule.keyword.clone())
                .or_insert_with(|| rule.label.clone());
        }
        let mut patterns = IndexMap::new();
        for rule in rules.patterns() {
            patterns
                .entry(rule.keyword.clone())
                .or_insert_with(|| rule.label.clone());
        }

        RuleSchema {
            village_keywords,
            overrides: rules
                .overrides()
                .iter()
                .map(|rule| OverrideEntry {
                    contains: rule.contains.clone(),
                    label: rule
                        .label
                        .clone()
                        .unwrap_or_else(|| rules.fallback_label().to_string()),
                })
                .collect(),
            patterns,
            villages: rules.village_labels().into_iter().map(str::to_string).collect(),
            fallback_label: rules.fallback_label().to_string(),
            unknown_label: rules.unknown_label().to_string(),
            price_ranges: RangeEntry::from_bands(rules.price_bands()),
            area_types: RangeEntry::from_bands(rules.size_bands()),
            area_divisor: rules.size_divisor(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Renders the schema as an ES module of named constants.
    pub fn to_js_module(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for (name, value) in [
            ("VILLAGE_KEYWORDS", serde_json::to_string(&self.village_keywords)?),
            ("VILLAGE_OVERRIDES", serde_json::to_string(&self.overrides)?),
            ("VILLAGE_PATTERNS", serde_json::to_string(&self.patterns)?),
            ("PRICE_RANGES", serde_json::to_string(&self.price_ranges)?),
            ("AREA_TYPES", serde_json::to_string(&self.area_types)?),
            ("AREA_DIVISOR", serde_json::to_string(&self.area_divisor)?),
            ("UNKNOWN_LABEL", serde_json::to_string(&self.unknown_label)?),
            ("FALLBACK_LABEL", serde_json::to_string(&self.fallback_label)?),
            ("VILLAGES", serde_json::to_string(&self.villages)?),
        ] {
            out.push_str(&format!("export const {name} = {value};\n"));
        }
        Ok(out)
    }
}
