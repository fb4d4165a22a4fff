use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

use sejong_apt::fetch::{BasicClient, HttpClient, RetryPolicy, WithHeaders, fetch_json};
use sejong_apt::listing::{Article, Complex, ComplexRef, Region};
use sejong_apt::record::number_from_value;

use crate::services::listing_api::{ArticlePage, ListingApi};

const BASE_URL: &str = "https://new.land.naver.com/api";

/// Apartment, apartment presale rights and redevelopment.
const REAL_ESTATE_TYPE: &str = "APT:ABYG:JGC";

/// The API only answers requests that look like they come from its web app.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    ),
    ("Referer", "https://new.land.naver.com/"),
    ("Accept", "application/json"),
];

pub struct NaverLandClient<C = WithHeaders<BasicClient>> {
    http: C,
    base_url: String,
    policy: RetryPolicy,
}

impl NaverLandClient {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        let http = WithHeaders::new(BasicClient::new()?, BROWSER_HEADERS)?;
        Ok(Self::with_client(http, BASE_URL, policy))
    }
}

impl<C> NaverLandClient<C> {
    pub fn with_client(http: C, base_url: &str, policy: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }
}

impl<C: HttpClient> NaverLandClient<C> {
    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        fetch_json(&self.http, &url, &self.policy).await
    }
}

fn extract_date() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Strings and numbers both come back as text; the API is not consistent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn integer<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    number_from_value(value).and_then(|n| T::try_from(n as i64).ok())
}

fn items<'a>(json: &'a Value, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| json[*key].as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub(crate) fn parse_regions(json: &Value) -> Vec<Region> {
    items(json, &["regionList"])
        .iter()
        .filter_map(|item| {
            Some(Region {
                cortar_no: text(&item["cortarNo"])?,
                cortar_name: text(&item["cortarName"]),
            })
        })
        .collect()
}

pub(crate) fn parse_complexes(json: &Value) -> Vec<ComplexRef> {
    items(json, &["complexes", "complexList"])
        .iter()
        .filter_map(|item| {
            Some(ComplexRef {
                complex_no: text(&item["complexNo"])?,
                complex_name: text(&item["complexName"]),
            })
        })
        .collect()
}

pub(crate) fn parse_detail(json: &Value, complex_no: &str, cortar_no: &str, extracted: &str) -> Complex {
    // some responses nest the fields under "complexDetail"
    let detail = if json["complexDetail"].is_object() {
        &json["complexDetail"]
    } else {
        json
    };

    Complex {
        complex_no: complex_no.to_string(),
        complex_name: text(&detail["complexName"]),
        cortar_no: cortar_no.to_string(),
        road_address: text(&detail["roadAddressPrefix"]),
        total_household_count: integer(&detail["totalHouseholdCount"]),
        high_floor: integer(&detail["highFloor"]),
        low_floor: integer(&detail["lowFloor"]),
        completion_year: text(&detail["completionYear"]),
        latitude: number_from_value(&detail["latitude"]),
        longitude: number_from_value(&detail["longitude"]),
        deal_price_min: text(&detail["dealPriceMin"]),
        deal_price_max: text(&detail["dealPriceMax"]),
        extract_date: extracted.to_string(),
    }
}

pub(crate) fn parse_articles(json: &Value, complex_no: &str, extracted: &str) -> ArticlePage {
    let articles = items(json, &["articleList"])
        .iter()
        .map(|item| Article {
            complex_no: complex_no.to_string(),
            complex_name: None,
            article_no: text(&item["articleNo"]),
            article_name: text(&item["articleName"]),
            trade_type_name: text(&item["tradeTypeName"]),
            deal_or_warrant_prc: text(&item["dealOrWarrantPrc"]),
            rent_prc: text(&item["rentPrc"]),
            area_name: text(&item["areaName"]),
            area1: number_from_value(&item["area1"]),
            area2: number_from_value(&item["area2"]),
            floor_info: text(&item["floorInfo"]),
            direction: text(&item["direction"]),
            article_confirm_ymd: text(&item["articleConfirmYmd"]),
            realtor_name: text(&item["realtorName"]),
            extract_date: extracted.to_string(),
        })
        .collect();

    ArticlePage {
        articles,
        has_more: json["isMoreData"].as_bool().unwrap_or(false),
    }
}

#[async_trait]
impl<C: HttpClient> ListingApi for NaverLandClient<C> {
    async fn regions(&self, cortar_no: &str) -> Result<Vec<Region>> {
        let json = self.get(&format!("/regions/list?cortarNo={cortar_no}")).await?;
        Ok(parse_regions(&json))
    }

    async fn complexes(&self, cortar_no: &str) -> Result<Vec<ComplexRef>> {
        let json = self
            .get(&format!(
                "/regions/complexes?cortarNo={cortar_no}&realEstateType={REAL_ESTATE_TYPE}"
            ))
            .await?;
        Ok(parse_complexes(&json))
    }

    async fn complex_detail(&self, complex_no: &str, cortar_no: &str) -> Result<Complex> {
        let json = self
            .get(&format!("/complexes/{complex_no}?sameAddressGroup=false"))
            .await?;
        Ok(parse_detail(&json, complex_no, cortar_no, &extract_date()))
    }

    async fn articles(&self, complex_no: &str, page: u32) -> Result<ArticlePage> {
        let json = self
            .get(&format!(
                "/articles/complex/{complex_no}?realEstateType={REAL_ESTATE_TYPE}&page={page}&priceType=RETAIL"
            ))
            .await?;
        Ok(parse_articles(&json, complex_no, &extract_date()))
    }
}
