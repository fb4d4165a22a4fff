//! Trait and types for interacting with a real-estate listing site.

use anyhow::Result;
use sejong_apt::listing::{Article, Complex, ComplexRef, Region};

/// One page of articles for a complex.
#[derive(Debug, Clone, Default)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub has_more: bool,
}

/// Abstraction over a listing provider (e.g., Naver Land).
#[async_trait::async_trait]
pub trait ListingApi: Send + Sync {
    /// Sub-regions of `cortar_no`. May be empty for a single-district city.
    async fn regions(&self, cortar_no: &str) -> Result<Vec<Region>>;

    /// Apartment complexes in a region.
    async fn complexes(&self, cortar_no: &str) -> Result<Vec<ComplexRef>>;

    async fn complex_detail(&self, complex_no: &str, cortar_no: &str) -> Result<Complex>;

    /// Articles for a complex, 1-based `page`.
    async fn articles(&self, complex_no: &str, page: u32) -> Result<ArticlePage>;
}
