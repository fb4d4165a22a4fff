use crate::classify::rules::{Band, ClassificationRuleSet};

/// Finds the band holding `value` in a validated, contiguous table.
///
/// Lower bounds are inclusive. Anything at or above the last band's lower
/// bound lands in the last band whatever its stated upper bound. Values that
/// are zero, negative or not finite have no band.
pub fn locate_band(bands: &[Band], value: f64) -> Option<&Band> {
    if !(value.is_finite() && value > 0.0) {
        return None;
    }
    let idx = bands.partition_point(|band| band.lower <= value);
    idx.checked_sub(1).and_then(|i| bands.get(i))
}

impl ClassificationRuleSet {
    /// The price band for `price` (만원), or `None` when there is no usable price.
    pub fn price_band(&self, price: Option<f64>) -> Option<&Band> {
        price.and_then(|p| locate_band(self.price_bands(), p))
    }

    /// The size band for a raw area, after dividing by the size divisor.
    pub fn size_band(&self, area: Option<f64>) -> Option<&Band> {
        area.and_then(|a| locate_band(self.size_bands(), a / self.size_divisor()))
    }

    /// Price band label; the unknown label when the price is absent or zero.
    pub fn classify_price(&self, price: Option<f64>) -> &str {
        self.price_band(price)
            .map(|band| band.label.as_str())
            .unwrap_or(self.unknown_label())
    }

    /// Size band label; the unknown label when the area is absent or zero.
    pub fn classify_size(&self, area: Option<f64>) -> &str {
        self.size_band(area)
            .map(|band| band.label.as_str())
            .unwrap_or(self.unknown_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::rules::{BandTable, DEFAULT_UNKNOWN_LABEL, RulesConfig};

    fn rules() -> ClassificationRuleSet {
        ClassificationRuleSet::default()
    }

    #[test]
    fn test_absent_and_zero_price_are_unknown() {
        assert_eq!(rules().classify_price(None), DEFAULT_UNKNOWN_LABEL);
        // a genuine zero cannot be told apart from a missing price
        assert_eq!(rules().classify_price(Some(0.0)), DEFAULT_UNKNOWN_LABEL);
    }

    #[test]
    fn test_negative_and_non_finite_price_are_unknown() {
        assert_eq!(rules().classify_price(Some(-1.0)), DEFAULT_UNKNOWN_LABEL);
        assert_eq!(rules().classify_price(Some(f64::NAN)), DEFAULT_UNKNOWN_LABEL);
        assert_eq!(rules().classify_price(Some(f64::INFINITY)), DEFAULT_UNKNOWN_LABEL);
    }

    #[test]
    fn test_price_boundaries_are_lower_inclusive() {
        let rules = rules();
        assert_eq!(rules.classify_price(Some(1.0)), "1억 미만");
        assert_eq!(rules.classify_price(Some(9999.0)), "1억 미만");
        assert_eq!(rules.classify_price(Some(9999.99)), "1억 미만");
        assert_eq!(rules.classify_price(Some(10000.0)), "1억대");
        assert_eq!(rules.classify_price(Some(19999.5)), "1억대");
        assert_eq!(rules.classify_price(Some(20000.0)), "2억대");
        assert_eq!(rules.classify_price(Some(89999.0)), "8억대");
        assert_eq!(rules.classify_price(Some(90000.0)), "9억 이상");
    }

    #[test]
    fn test_last_band_is_open_ended() {
        let rules = rules();
        assert_eq!(rules.classify_price(Some(250000.0)), "9억 이상");
        assert_eq!(rules.classify_price(Some(1.0e12)), "9억 이상");
    }

    #[test]
    fn test_last_band_upper_is_only_a_sentinel() {
        let config = RulesConfig {
            price: BandTable {
                bands: vec![
                    Band::new(0.0, Some(10000.0), "1억 미만"),
                    Band::new(10000.0, Some(20000.0), "1억 이상"),
                ],
            },
            ..RulesConfig::default()
        };
        let rules = config.build().unwrap();
        assert_eq!(rules.classify_price(Some(10000.0)), "1억 이상");
        assert_eq!(rules.classify_price(Some(50000.0)), "1억 이상");
    }

    #[test]
    fn test_size_uses_pyeong() {
        let rules = rules();
        // 99㎡ / 3.3 = 30평
        assert_eq!(rules.classify_size(Some(99.0)), "30평대");
        assert_eq!(rules.classify_size(Some(84.9)), "20평대");
        assert_eq!(rules.classify_size(Some(59.9)), "10평대");
        assert_eq!(rules.classify_size(Some(20.0)), "10평 미만");
        assert_eq!(rules.classify_size(Some(165.0)), "50평 이상");
    }

    #[test]
    fn test_absent_and_zero_area_are_unknown() {
        assert_eq!(rules().classify_size(None), DEFAULT_UNKNOWN_LABEL);
        assert_eq!(rules().classify_size(Some(0.0)), DEFAULT_UNKNOWN_LABEL);
    }

    #[test]
    fn test_locate_band_empty_table() {
        assert!(locate_band(&[], 5.0).is_none());
    }

    #[test]
    fn test_every_positive_price_has_exactly_one_band() {
        let rules = rules();
        for price in [0.5, 1.0, 5000.0, 10000.0, 45000.5, 90000.0, 123456.0] {
            let hits = rules
                .price_bands()
                .iter()
                .enumerate()
                .filter(|(i, b)| {
                    let last = *i == rules.price_bands().len() - 1;
                    price >= b.lower && (last || b.upper.is_some_and(|u| price < u))
                })
                .count();
            assert_eq!(hits, 1, "{price}");
        }
    }
}
