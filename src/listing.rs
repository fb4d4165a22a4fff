//! Complex and article records pulled from the listing site, and the
//! per-complex rows the classifier consumes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::utility::{median, mode};
use crate::parser::parse_korean_price;
use crate::record::{FieldNames, ListingRecord};

/// Trade type of outright sales.
pub const SALE_TRADE_TYPE: &str = "매매";

/// An administrative region (cortar) below the city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub cortar_no: String,
    pub cortar_name: Option<String>,
}

/// A complex as it appears in a region listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexRef {
    pub complex_no: String,
    pub complex_name: Option<String>,
}

/// Complex details, one CSV row per complex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complex {
    pub complex_no: String,
    pub complex_name: Option<String>,
    pub cortar_no: String,
    pub road_address: Option<String>,
    pub total_household_count: Option<u32>,
    pub high_floor: Option<i32>,
    pub low_floor: Option<i32>,
    pub completion_year: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub deal_price_min: Option<String>,
    pub deal_price_max: Option<String>,
    pub extract_date: String,
}

/// A single listing (매물), one CSV row per article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub complex_no: String,
    pub complex_name: Option<String>,
    pub article_no: Option<String>,
    pub article_name: Option<String>,
    pub trade_type_name: Option<String>,
    pub deal_or_warrant_prc: Option<String>,
    pub rent_prc: Option<String>,
    pub area_name: Option<String>,
    /// Supply area, ㎡.
    pub area1: Option<f64>,
    /// Exclusive area, ㎡.
    pub area2: Option<f64>,
    pub floor_info: Option<String>,
    pub direction: Option<String>,
    pub article_confirm_ymd: Option<String>,
    pub realtor_name: Option<String>,
    pub extract_date: String,
}

impl Article {
    pub fn is_sale(&self) -> bool {
        self.trade_type_name.as_deref() == Some(SALE_TRADE_TYPE)
    }

    /// Sale or deposit price in 만원.
    pub fn price(&self) -> Option<f64> {
        self.deal_or_warrant_prc.as_deref().and_then(parse_korean_price)
    }
}

/// Builds one classifier input row per complex.
///
/// The price is the median of the complex's sale articles; the area is the
/// most frequent exclusive area among all its articles. Complexes without
/// sale articles get a null price.
pub fn build_listing_rows(
    complexes: &[Complex],
    articles: &[Article],
    names: &FieldNames,
) -> Vec<ListingRecord> {
    complexes
        .iter()
        .map(|complex| {
            let own: Vec<&Article> = articles
                .iter()
                .filter(|a| a.complex_no == complex.complex_no)
                .collect();
            let sale_prices: Vec<f64> = own
                .iter()
                .filter(|a| a.is_sale())
                .filter_map(|a| a.price())
                .collect();
            let areas: Vec<f64> = own.iter().filter_map(|a| a.area2).collect();

            ListingRecord::new()
                .with("complexNo", complex.complex_no.clone())
                .with(names.name.clone(), complex.complex_name.clone().unwrap_or_default())
                .with(names.price.clone(), optional_number(median(&sale_prices)))
                .with(names.area.clone(), optional_number(mode(&areas)))
                .with("articleCount", own.len())
                .with("saleCount", sale_prices.len())
                .with("totalHouseholdCount", complex.total_household_count)
                .with("completionYear", complex.completion_year.clone())
                .with("roadAddress", complex.road_address.clone())
                .with("cortarNo", complex.cortar_no.clone())
                .with("extractDate", complex.extract_date.clone())
        })
        .collect()
}

fn optional_number(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complex(no: &str, name: &str) -> Complex {
        Complex {
            complex_no: no.to_string(),
            complex_name: Some(name.to_string()),
            cortar_no: "3611000000".to_string(),
            extract_date: "2026-10-15 09:00:00".to_string(),
            ..Default::default()
        }
    }

    fn article(no: &str, trade: &str, price: &str, area2: f64) -> Article {
        Article {
            complex_no: no.to_string(),
            trade_type_name: Some(trade.to_string()),
            deal_or_warrant_prc: Some(price.to_string()),
            area2: Some(area2),
            ..Default::default()
        }
    }

    #[test]
    fn test_article_price_and_sale() {
        let a = article("1", "매매", "5억 2,000", 84.0);
        assert!(a.is_sale());
        assert_eq!(a.price(), Some(52000.0));
        assert!(!article("1", "전세", "3억", 84.0).is_sale());
    }

    #[test]
    fn test_build_listing_rows() {
        let names = FieldNames::default();
        let complexes = vec![complex("1", "가락마을 1단지"), complex("2", "우빈가온타워")];
        let articles = vec![
            article("1", "매매", "5억", 84.0),
            article("1", "매매", "6억", 84.0),
            article("1", "매매", "4억", 59.0),
            article("1", "전세", "3억", 101.0),
            article("2", "월세", "1,000", 25.0),
        ];

        let rows = build_listing_rows(&complexes, &articles, &names);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].text(&names.name), "가락마을 1단지");
        assert_eq!(rows[0].number(&names.price), Some(50000.0));
        assert_eq!(rows[0].number(&names.area), Some(84.0));
        assert_eq!(rows[0].number("articleCount"), Some(4.0));
        assert_eq!(rows[0].number("saleCount"), Some(3.0));

        // no sales: price stays null so it classifies as unknown
        assert_eq!(rows[1].get(&names.price), Some(&Value::Null));
        assert_eq!(rows[1].number(&names.area), Some(25.0));
    }

    #[test]
    fn test_complex_csv_header_is_camel_case() {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.serialize(complex("1", "가락마을 1단지")).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert!(text.starts_with("complexNo,complexName,cortarNo,roadAddress"));
    }
}
