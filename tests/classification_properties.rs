use proptest::prelude::*;
use sejong_apt::ListingRecord;
use sejong_apt::classify::{ClassificationRuleSet, process, process_sharded};
use serde_json::Value;

fn listing(name: String, price: Option<f64>, area: Option<f64>) -> ListingRecord {
    ListingRecord::new()
        .with("단지명", name)
        .with("중간매매가(만원)", price.map(Value::from).unwrap_or(Value::Null))
        .with("대표면적(㎡)", area.map(Value::from).unwrap_or(Value::Null))
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\PC{0,12}",
        prop::sample::select(vec!["가락", "도담", "우빈가온", "새뜸", "해밀", "첫마을", "오피스텔"])
            .prop_flat_map(|keyword| ("\\PC{0,4}", "\\PC{0,4}").prop_map(move |(a, b)| format!("{a}{keyword}{b}"))),
    ]
}

fn listing_strategy() -> impl Strategy<Value = ListingRecord> {
    (
        name_strategy(),
        prop::option::of(prop_oneof![(0u32..150_000).prop_map(f64::from), 0.0f64..150_000.0]),
        prop::option::of(prop_oneof![(0u16..400).prop_map(f64::from), 0.0f64..400.0]),
    )
        .prop_map(|(name, price, area)| listing(name, price, area))
}

proptest! {
    #[test]
    fn every_positive_price_lands_in_exactly_one_band(price in 0.01f64..1.0e7) {
        let rules = ClassificationRuleSet::default();
        let band = rules.price_band(Some(price)).expect("positive price has a band");

        prop_assert!(band.lower <= price);
        if let Some(upper) = band.upper {
            prop_assert!(price < upper);
        }

        let matching = rules
            .price_bands()
            .iter()
            .enumerate()
            .filter(|(i, b)| {
                let last = *i + 1 == rules.price_bands().len();
                b.lower <= price && (last || b.upper.is_some_and(|u| price < u))
            })
            .count();
        prop_assert_eq!(matching, 1);
    }

    #[test]
    fn non_positive_or_non_finite_is_unknown(
        price in prop_oneof![
            Just(0.0f64),
            -1.0e7f64..0.0,
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
        ]
    ) {
        let rules = ClassificationRuleSet::default();
        prop_assert_eq!(rules.classify_price(Some(price)), rules.unknown_label());
        prop_assert_eq!(rules.classify_size(Some(price)), rules.unknown_label());
    }

    #[test]
    fn village_label_is_always_a_known_label(name in name_strategy()) {
        let rules = ClassificationRuleSet::default();
        let label = rules.classify_village(&name);
        prop_assert!(rules.village_labels().contains(&label));
    }

    #[test]
    fn summary_counts_add_up(records in prop::collection::vec(listing_strategy(), 0..60)) {
        let rules = ClassificationRuleSet::default();
        let total = records.len();
        let result = process(&rules, records);
        let summary = &result.summary;

        prop_assert_eq!(summary.total_count, total);
        prop_assert_eq!(result.records.len(), total);
        prop_assert_eq!(summary.village_summary.values().map(|v| v.count).sum::<usize>(), total);
        prop_assert_eq!(summary.price_distribution.values().sum::<usize>(), total);
        prop_assert_eq!(summary.size_distribution.values().sum::<usize>(), total);

        for village in summary.village_summary.values() {
            prop_assert!(village.priced_count <= village.count);
            match (village.min_price, village.mean_price, village.max_price) {
                (Some(min), Some(mean), Some(max)) => {
                    prop_assert!(min <= mean + 1e-6 && mean <= max + 1e-6);
                }
                (None, None, None) => prop_assert_eq!(village.priced_count, 0),
                other => prop_assert!(false, "inconsistent price stats: {:?}", other),
            }
        }
    }

    #[test]
    fn sharding_does_not_change_the_result(
        records in prop::collection::vec(listing_strategy(), 0..60),
        shards in 1usize..8,
    ) {
        let rules = ClassificationRuleSet::default();
        let sequential = process(&rules, records.clone());
        let sharded = process_sharded(&rules, records, shards);
        prop_assert_eq!(sequential, sharded);
    }

    #[test]
    fn labeling_is_deterministic(records in prop::collection::vec(listing_strategy(), 0..30)) {
        let rules = ClassificationRuleSet::default();
        let first = process(&rules, records.clone());
        let second = process(&rules, records);
        prop_assert_eq!(first, second);
    }
}

#[test]
fn every_band_includes_its_lower_bound() {
    let rules = ClassificationRuleSet::default();
    for band in rules.price_bands().iter().filter(|b| b.lower > 0.0) {
        assert_eq!(rules.classify_price(Some(band.lower)), band.label);
    }
    for band in rules.size_bands().iter().filter(|b| b.lower > 0.0) {
        let area = band.lower * rules.size_divisor();
        assert_eq!(rules.classify_size(Some(area)), band.label, "area {area}");
    }
}
