//! Rule tables for village, price band and size band classification.
//!
//! Tables are read once (built-in defaults or a TOML file), validated, and
//! then frozen into a [`ClassificationRuleSet`] that every classifier call
//! borrows. Nothing here is mutated after startup.

use crate::error::ConfigError;
use crate::record::FieldNames;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_FALLBACK_LABEL: &str = "기타(도시형/오피스텔)";
pub const DEFAULT_UNKNOWN_LABEL: &str = "정보없음";

/// One square metre expressed in 평 is 1/3.3.
pub const DEFAULT_SIZE_DIVISOR: f64 = 3.3;

/// Officially named villages, in match order.
static VILLAGE_KEYWORDS: &[(&str, &str)] = &[
    ("가락", "가락마을"),
    ("가온", "가온마을"),
    ("가재", "가재마을"),
    ("나릿재", "나릿재마을"),
    ("도램", "도램마을"),
    ("범지기", "범지기마을"),
    ("산울", "산울마을"),
    ("새나루", "새나루마을"),
    ("새뜸", "새뜸마을"),
    ("새샘", "새샘마을"),
    ("수루배", "수루배마을"),
    ("첫마을", "첫마을"),
    ("한뜰", "한뜰마을"),
    ("해들", "해들마을"),
    ("해밀", "해밀마을"),
    ("호려울", "호려울마을"),
];

/// Alternate spellings checked after the main table.
static SECONDARY_PATTERNS: &[(&str, &str)] = &[("도담", "도램마을")];

/// Brand names that happen to contain a village keyword.
static OVERRIDES: &[&str] = &["우빈가온"];

/// 만원 thresholds.
static PRICE_BANDS: &[(f64, Option<f64>, &str)] = &[
    (0.0, Some(10000.0), "1억 미만"),
    (10000.0, Some(20000.0), "1억대"),
    (20000.0, Some(30000.0), "2억대"),
    (30000.0, Some(40000.0), "3억대"),
    (40000.0, Some(50000.0), "4억대"),
    (50000.0, Some(60000.0), "5억대"),
    (60000.0, Some(70000.0), "6억대"),
    (70000.0, Some(80000.0), "7억대"),
    (80000.0, Some(90000.0), "8억대"),
    (90000.0, None, "9억 이상"),
];

/// 평 thresholds.
static SIZE_BANDS: &[(f64, Option<f64>, &str)] = &[
    (0.0, Some(10.0), "10평 미만"),
    (10.0, Some(20.0), "10평대"),
    (20.0, Some(30.0), "20평대"),
    (30.0, Some(40.0), "30평대"),
    (40.0, Some(50.0), "40평대"),
    (50.0, None, "50평 이상"),
];

/// Maps a substring of a complex name to a village label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub label: String,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            label: label.into(),
        }
    }
}

/// Forces any name containing `contains` to `label` (the fallback when unset)
/// before keyword matching runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub contains: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A half-open interval `[lower, upper)`. The last band of a table may omit
/// `upper`; if it is given anyway it is only a sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lower: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
    pub label: String,
}

impl Band {
    pub fn new(lower: f64, upper: Option<f64>, label: impl Into<String>) -> Self {
        Self {
            lower,
            upper,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTable {
    pub bands: Vec<Band>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeBands {
    /// Raw area is divided by this before thresholds are compared.
    #[serde(default = "default_divisor")]
    pub divisor: f64,
    pub bands: Vec<Band>,
}

fn default_divisor() -> f64 {
    DEFAULT_SIZE_DIVISOR
}

fn bands_from(table: &[(f64, Option<f64>, &str)]) -> Vec<Band> {
    table
        .iter()
        .map(|(lower, upper, label)| Band::new(*lower, *upper, *label))
        .collect()
}

fn keywords_from(table: &[(&str, &str)]) -> Vec<KeywordRule> {
    table
        .iter()
        .map(|(keyword, label)| KeywordRule::new(*keyword, *label))
        .collect()
}

/// Rule tables as written in a configuration file. Any section left out
/// keeps its built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub fallback_label: String,
    pub unknown_label: String,
    pub overrides: Vec<OverrideRule>,
    pub villages: Vec<KeywordRule>,
    pub patterns: Vec<KeywordRule>,
    pub price: BandTable,
    pub size: SizeBands,
    pub fields: FieldNames,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            fallback_label: DEFAULT_FALLBACK_LABEL.to_string(),
            unknown_label: DEFAULT_UNKNOWN_LABEL.to_string(),
            overrides: OVERRIDES
                .iter()
                .map(|contains| OverrideRule {
                    contains: contains.to_string(),
                    label: None,
                })
                .collect(),
            villages: keywords_from(VILLAGE_KEYWORDS),
            patterns: keywords_from(SECONDARY_PATTERNS),
            price: BandTable {
                bands: bands_from(PRICE_BANDS),
            },
            size: SizeBands {
                divisor: DEFAULT_SIZE_DIVISOR,
                bands: bands_from(SIZE_BANDS),
            },
            fields: FieldNames::default(),
        }
    }
}

impl RulesConfig {
    /// Parse rules from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load rules from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validates the tables and freezes them.
    pub fn build(self) -> Result<ClassificationRuleSet, ConfigError> {
        if self.fallback_label.trim().is_empty() {
            return Err(ConfigError::EmptyName {
                what: "fallback_label",
            });
        }
        if self.unknown_label.trim().is_empty() {
            return Err(ConfigError::EmptyName {
                what: "unknown_label",
            });
        }
        if self.villages.is_empty() {
            return Err(ConfigError::EmptyKeywords);
        }

        validate_keywords(&self.villages, &self.patterns)?;
        for rule in &self.overrides {
            if rule.contains.is_empty() {
                return Err(ConfigError::EmptyKeyword { table: "override" });
            }
            if let Some(label) = &rule.label {
                if label.trim().is_empty() {
                    return Err(ConfigError::EmptyLabel {
                        keyword: rule.contains.clone(),
                    });
                }
            }
        }

        validate_bands("price", &self.price.bands, &self.unknown_label)?;
        if !(self.size.divisor.is_finite() && self.size.divisor > 0.0) {
            return Err(ConfigError::InvalidDivisor(self.size.divisor));
        }
        validate_bands("size", &self.size.bands, &self.unknown_label)?;

        for (what, name) in [
            ("fields.name", &self.fields.name),
            ("fields.price", &self.fields.price),
            ("fields.area", &self.fields.area),
            ("fields.village_label", &self.fields.village_label),
            ("fields.price_label", &self.fields.price_label),
            ("fields.size_label", &self.fields.size_label),
        ] {
            if name.is_empty() {
                return Err(ConfigError::EmptyName { what });
            }
        }

        debug!(
            villages = self.villages.len(),
            overrides = self.overrides.len(),
            patterns = self.patterns.len(),
            price_bands = self.price.bands.len(),
            size_bands = self.size.bands.len(),
            "Rule tables validated"
        );

        Ok(ClassificationRuleSet { config: self })
    }
}

fn validate_keywords(villages: &[KeywordRule], patterns: &[KeywordRule]) -> Result<(), ConfigError> {
    let mut seen: IndexMap<&str, &str> = IndexMap::new();

    for (table, rules) in [("village", villages), ("pattern", patterns)] {
        for rule in rules {
            if rule.keyword.is_empty() {
                return Err(ConfigError::EmptyKeyword { table });
            }
            if rule.label.trim().is_empty() {
                return Err(ConfigError::EmptyLabel {
                    keyword: rule.keyword.clone(),
                });
            }
            match seen.get(rule.keyword.as_str()) {
                Some(first) if *first != rule.label => {
                    return Err(ConfigError::AmbiguousKeyword {
                        keyword: rule.keyword.clone(),
                        first: first.to_string(),
                        second: rule.label.clone(),
                    });
                }
                Some(_) => {
                    warn!(keyword = %rule.keyword, table, "Duplicate keyword is never reached");
                }
                None => {
                    seen.insert(&rule.keyword, &rule.label);
                }
            }
        }
    }

    Ok(())
}

/// Checks that bands are contiguous, start at zero and only the last one is
/// open-ended. Comparisons are written so NaN bounds fail.
fn validate_bands(table: &'static str, bands: &[Band], unknown: &str) -> Result<(), ConfigError> {
    let first = bands.first().ok_or(ConfigError::EmptyBands { table })?;
    if first.lower != 0.0 {
        return Err(ConfigError::UncoveredStart {
            table,
            lower: first.lower,
        });
    }

    let mut labels: Vec<&str> = Vec::with_capacity(bands.len());
    for (i, band) in bands.iter().enumerate() {
        if band.label.trim().is_empty() {
            return Err(ConfigError::EmptyName { what: "band label" });
        }
        if band.label == unknown {
            return Err(ConfigError::UnknownLabelCollision {
                table,
                label: band.label.clone(),
            });
        }
        if labels.contains(&band.label.as_str()) {
            return Err(ConfigError::DuplicateBandLabel {
                table,
                label: band.label.clone(),
            });
        }
        labels.push(&band.label);

        let next = bands.get(i + 1);
        let upper = match (band.upper, next) {
            (Some(upper), _) => upper,
            (None, None) => continue,
            (None, Some(_)) => {
                return Err(ConfigError::OpenBandNotLast {
                    table,
                    label: band.label.clone(),
                });
            }
        };

        if !(upper > band.lower) {
            return Err(ConfigError::InvertedBand {
                table,
                label: band.label.clone(),
                lower: band.lower,
                upper,
            });
        }

        if let Some(next) = next {
            if next.lower > upper {
                return Err(ConfigError::Gap {
                    table,
                    label: next.label.clone(),
                    upper,
                    next_lower: next.lower,
                });
            }
            if !(next.lower >= upper) {
                return Err(ConfigError::Overlap {
                    table,
                    label: next.label.clone(),
                    upper,
                    next_lower: next.lower,
                });
            }
        }
    }

    Ok(())
}

/// Validated, immutable rule tables.
///
/// Only obtainable through [`RulesConfig::build`] (or [`Default`], which
/// holds the built-in tables), so classifiers can assume every invariant
/// checked there.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRuleSet {
    config: RulesConfig,
}

impl Default for ClassificationRuleSet {
    fn default() -> Self {
        Self {
            config: RulesConfig::default(),
        }
    }
}

impl ClassificationRuleSet {
    /// Loads rules from `path` when given, otherwise uses the built-in tables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => RulesConfig::from_file(path)?.build(),
            None => Ok(Self::default()),
        }
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn overrides(&self) -> &[OverrideRule] {
        &self.config.overrides
    }

    pub fn villages(&self) -> &[KeywordRule] {
        &self.config.villages
    }

    pub fn patterns(&self) -> &[KeywordRule] {
        &self.config.patterns
    }

    pub fn fallback_label(&self) -> &str {
        &self.config.fallback_label
    }

    pub fn unknown_label(&self) -> &str {
        &self.config.unknown_label
    }

    pub fn price_bands(&self) -> &[Band] {
        &self.config.price.bands
    }

    pub fn size_bands(&self) -> &[Band] {
        &self.config.size.bands
    }

    pub fn size_divisor(&self) -> f64 {
        self.config.size.divisor
    }

    pub fn fields(&self) -> &FieldNames {
        &self.config.fields
    }

    /// Every village label the classifier can return, in canonical order:
    /// keyword table, secondary patterns, override targets, fallback last.
    pub fn village_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        let candidates = self
            .config
            .villages
            .iter()
            .chain(self.config.patterns.iter())
            .map(|rule| rule.label.as_str())
            .chain(
                self.config
                    .overrides
                    .iter()
                    .filter_map(|rule| rule.label.as_deref()),
            );
        for label in candidates {
            if label != self.fallback_label() && !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels.push(self.fallback_label());
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(lower: f64, upper: Option<f64>, label: &str) -> Band {
        Band::new(lower, upper, label)
    }

    fn config_with_price(bands: Vec<Band>) -> RulesConfig {
        RulesConfig {
            price: BandTable { bands },
            ..RulesConfig::default()
        }
    }

    #[test]
    fn test_default_rules_validate() {
        let rules = RulesConfig::default().build().unwrap();
        assert_eq!(rules, ClassificationRuleSet::default());
        assert_eq!(rules.villages().len(), 16);
        assert_eq!(rules.price_bands().len(), 10);
        assert_eq!(rules.size_bands().len(), 6);
    }

    #[test]
    fn test_default_keyword_order_is_preserved() {
        let rules = ClassificationRuleSet::default();
        let keywords: Vec<_> = rules.villages().iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keywords[0], "가락");
        assert_eq!(keywords[1], "가온");
        assert_eq!(keywords[15], "호려울");
    }

    #[test]
    fn test_village_labels_end_with_fallback() {
        let rules = ClassificationRuleSet::default();
        let labels = rules.village_labels();
        assert_eq!(labels.len(), 17);
        assert_eq!(labels[0], "가락마을");
        assert_eq!(labels.last().copied(), Some(DEFAULT_FALLBACK_LABEL));
        // 도담 maps to an already listed village
        assert_eq!(labels.iter().filter(|l| **l == "도램마을").count(), 1);
    }

    #[test]
    fn test_parse_rules_from_toml() {
        let toml = r#"
            fallback_label = "기타"

            [[villages]]
            keyword = "북"
            label = "북마을"

            [[villages]]
            keyword = "남"
            label = "남마을"

            [[overrides]]
            contains = "북남타워"

            [price]
            bands = [
                { lower = 0, upper = 100, label = "low" },
                { lower = 100, label = "high" },
            ]
        "#;

        let rules = RulesConfig::from_toml(toml).unwrap().build().unwrap();
        assert_eq!(rules.fallback_label(), "기타");
        assert_eq!(rules.villages().len(), 2);
        assert_eq!(rules.villages()[0].label, "북마을");
        assert_eq!(rules.price_bands().len(), 2);
        assert_eq!(rules.price_bands()[1].upper, None);
        // untouched sections keep defaults
        assert_eq!(rules.size_bands().len(), 6);
        assert_eq!(rules.unknown_label(), DEFAULT_UNKNOWN_LABEL);
        assert!(rules.patterns().iter().any(|p| p.keyword == "도담"));
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let original = RulesConfig::default();
        let text = original.to_toml().unwrap();
        let parsed = RulesConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = RulesConfig::from_toml("villages = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_keyword_table_rejected() {
        let config = RulesConfig {
            villages: vec![],
            ..RulesConfig::default()
        };
        assert_eq!(config.build().unwrap_err(), ConfigError::EmptyKeywords);
    }

    #[test]
    fn test_ambiguous_keyword_rejected() {
        let config = RulesConfig {
            villages: vec![KeywordRule::new("가락", "가락마을"), KeywordRule::new("가락", "다른마을")],
            ..RulesConfig::default()
        };
        assert!(matches!(
            config.build().unwrap_err(),
            ConfigError::AmbiguousKeyword { .. }
        ));
    }

    #[test]
    fn test_pattern_conflicting_with_village_keyword_rejected() {
        let config = RulesConfig {
            patterns: vec![KeywordRule::new("가락", "도램마을")],
            ..RulesConfig::default()
        };
        assert!(matches!(
            config.build().unwrap_err(),
            ConfigError::AmbiguousKeyword { .. }
        ));
    }

    #[test]
    fn test_identical_duplicate_keyword_allowed() {
        let config = RulesConfig {
            villages: vec![KeywordRule::new("가락", "가락마을"), KeywordRule::new("가락", "가락마을")],
            ..RulesConfig::default()
        };
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let config = RulesConfig {
            villages: vec![KeywordRule::new("", "가락마을")],
            ..RulesConfig::default()
        };
        assert_eq!(
            config.build().unwrap_err(),
            ConfigError::EmptyKeyword { table: "village" }
        );
    }

    #[test]
    fn test_empty_band_table_rejected() {
        let err = config_with_price(vec![]).build().unwrap_err();
        assert_eq!(err, ConfigError::EmptyBands { table: "price" });
    }

    #[test]
    fn test_band_not_starting_at_zero_rejected() {
        let err = config_with_price(vec![band(5.0, None, "a")]).build().unwrap_err();
        assert!(matches!(err, ConfigError::UncoveredStart { .. }));
    }

    #[test]
    fn test_gap_between_bands_rejected() {
        // the shape of the old `10000..19999, 20000..` table
        let err = config_with_price(vec![
            band(0.0, Some(10000.0), "a"),
            band(10000.0, Some(19999.0), "b"),
            band(20000.0, None, "c"),
        ])
        .build()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Gap { .. }));
    }

    #[test]
    fn test_overlapping_bands_rejected() {
        let err = config_with_price(vec![band(0.0, Some(100.0), "a"), band(50.0, None, "b")])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Overlap { .. }));
    }

    #[test]
    fn test_inverted_band_rejected() {
        let err = config_with_price(vec![band(0.0, Some(0.0), "a"), band(0.0, None, "b")])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedBand { .. }));
    }

    #[test]
    fn test_nan_bound_rejected() {
        let err = config_with_price(vec![band(0.0, Some(f64::NAN), "a"), band(10.0, None, "b")])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedBand { .. }));
    }

    #[test]
    fn test_open_band_in_middle_rejected() {
        let err = config_with_price(vec![band(0.0, None, "a"), band(10.0, None, "b")])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::OpenBandNotLast { .. }));
    }

    #[test]
    fn test_last_band_may_carry_sentinel_upper() {
        let config = config_with_price(vec![band(0.0, Some(10.0), "a"), band(10.0, Some(200000.0), "b")]);
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_duplicate_band_label_rejected() {
        let err = config_with_price(vec![band(0.0, Some(10.0), "a"), band(10.0, None, "a")])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateBandLabel { .. }));
    }

    #[test]
    fn test_band_label_equal_to_unknown_rejected() {
        let err = config_with_price(vec![band(0.0, None, DEFAULT_UNKNOWN_LABEL)])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLabelCollision { .. }));
    }

    #[test]
    fn test_invalid_divisor_rejected() {
        let mut config = RulesConfig::default();
        config.size.divisor = 0.0;
        assert_eq!(config.build().unwrap_err(), ConfigError::InvalidDivisor(0.0));
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        let rules = ClassificationRuleSet::load(None).unwrap();
        assert_eq!(rules, ClassificationRuleSet::default());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = ClassificationRuleSet::load(Some(Path::new("/nonexistent/rules.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
