//! Per-run collection statistics, appended to a history CSV after each run.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::classify::utility::RunningStats;
use crate::listing::{Article, Complex};

/// Summary of one collection run.
#[derive(Debug, Default, Serialize)]
pub struct CollectionStats {
    pub timestamp: DateTime<Utc>,
    pub region: Option<String>,
    pub complexes: usize,
    pub articles: usize,
    pub failed_complexes: usize,

    /// Articles per trade type (매매, 전세, 월세, ...). Logged only; CSV rows
    /// cannot hold a map.
    #[serde(skip)]
    pub by_trade_type: IndexMap<String, usize>,

    // sale prices, 만원
    pub sale_articles: usize,
    pub priced_sales: usize,
    pub sale_price_mean: Option<f64>,
    pub sale_price_min: Option<f64>,
    pub sale_price_max: Option<f64>,
}

impl CollectionStats {
    pub fn from_collection(complexes: &[Complex], articles: &[Article]) -> Self {
        let mut s = CollectionStats {
            timestamp: Utc::now(),
            complexes: complexes.len(),
            articles: articles.len(),
            ..Default::default()
        };

        let mut sale_prices = RunningStats::default();

        for a in articles {
            let trade = a.trade_type_name.as_deref().unwrap_or("unknown");
            *s.by_trade_type.entry(trade.to_string()).or_default() += 1;

            if a.is_sale() {
                s.sale_articles += 1;
                if let Some(price) = a.price() {
                    sale_prices.push(price);
                }
            }
        }

        s.priced_sales = sale_prices.count();
        s.sale_price_mean = sale_prices.mean();
        s.sale_price_min = sale_prices.min();
        s.sale_price_max = sale_prices.max();

        s
    }

    /// Set region metadata
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_failures(mut self, failed: usize) -> Self {
        self.failed_complexes = failed;
        self
    }

    /// Top complexes by article count, most listed first.
    pub fn top_complexes(articles: &[Article], limit: usize) -> Vec<(String, usize)> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for a in articles {
            let name = a.complex_name.clone().unwrap_or_else(|| a.complex_no.clone());
            *counts.entry(name).or_default() += 1;
        }
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        // stable sort keeps first-seen order among ties
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(complex: &str, trade: &str, price: &str) -> Article {
        Article {
            complex_no: complex.to_string(),
            complex_name: Some(format!("{complex}단지")),
            trade_type_name: Some(trade.to_string()),
            deal_or_warrant_prc: Some(price.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_collection_empty() {
        let stats = CollectionStats::from_collection(&[], &[]);
        assert_eq!(stats.complexes, 0);
        assert_eq!(stats.articles, 0);
        assert_eq!(stats.sale_price_mean, None);
    }

    #[test]
    fn test_from_collection_counts_trade_types_and_sale_prices() {
        let articles = vec![
            article("a", "매매", "3억"),
            article("a", "매매", "5억"),
            article("a", "매매", "협의"),
            article("b", "전세", "2억"),
            article("b", "월세", "1,000/50"),
        ];
        let stats = CollectionStats::from_collection(&[Complex::default()], &articles)
            .with_region("3611000000")
            .with_failures(2);

        assert_eq!(stats.complexes, 1);
        assert_eq!(stats.articles, 5);
        assert_eq!(stats.failed_complexes, 2);
        assert_eq!(stats.region.as_deref(), Some("3611000000"));
        assert_eq!(stats.by_trade_type["매매"], 3);
        assert_eq!(stats.by_trade_type["전세"], 1);
        assert_eq!(stats.sale_articles, 3);
        assert_eq!(stats.priced_sales, 2);
        assert_eq!(stats.sale_price_mean, Some(40000.0));
        assert_eq!(stats.sale_price_min, Some(30000.0));
        assert_eq!(stats.sale_price_max, Some(50000.0));
    }

    #[test]
    fn test_history_row_appends_as_csv() {
        let path = format!("{}/sejong_apt_test_history.csv", std::env::temp_dir().display());
        let _ = std::fs::remove_file(&path);

        let stats = CollectionStats::from_collection(&[], &[article("a", "매매", "3억")]);
        crate::output::append_record(&path, &stats).unwrap();
        crate::output::append_record(&path, &stats).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp,region,complexes,articles,failed_complexes,sale_articles,priced_sales,sale_price_mean,sale_price_min,sale_price_max")
        );
        assert_eq!(lines.count(), 2);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_top_complexes() {
        let articles = vec![
            article("a", "매매", "3억"),
            article("b", "매매", "3억"),
            article("b", "전세", "2억"),
            article("c", "매매", "3억"),
        ];
        let top = CollectionStats::top_complexes(&articles, 2);
        assert_eq!(top, vec![("b단지".to_string(), 2), ("a단지".to_string(), 1)]);
    }
}
