//! Walks a region on the listing site and gathers every complex and article.

use anyhow::Result;
use sejong_apt::listing::{Article, Complex};
use tracing::{debug, error, info, warn};

use crate::services::listing_api::ListingApi;

/// Upper bound on article pages per complex, in case the site keeps
/// reporting more data.
const MAX_ARTICLE_PAGES: u32 = 500;

#[derive(Debug, Default)]
pub struct Collection {
    pub complexes: Vec<Complex>,
    pub articles: Vec<Article>,
    /// Complexes skipped because their detail or articles could not be fetched.
    pub failed: usize,
}

/// Collects all complexes and articles under `region`.
///
/// A complex that fails is logged and skipped; only a failure to list the
/// region's complexes aborts the run.
#[tracing::instrument(skip(api))]
pub async fn collect_region<A: ListingApi>(api: &A, region: &str) -> Result<Collection> {
    let regions = match api.regions(region).await {
        Ok(regions) => regions,
        Err(e) => {
            warn!(error = %e, "Region list failed, using the region itself");
            Vec::new()
        }
    };
    let codes: Vec<String> = if regions.is_empty() {
        vec![region.to_string()]
    } else {
        regions.into_iter().map(|r| r.cortar_no).collect()
    };
    info!(regions = codes.len(), "Listing complexes");

    let mut collection = Collection::default();

    for cortar_no in &codes {
        let complexes = api.complexes(cortar_no).await?;
        info!(cortar_no = %cortar_no, complexes = complexes.len(), "Complexes found");

        for complex_ref in complexes {
            let complex_no = complex_ref.complex_no.clone();
            match collect_complex(api, &complex_no, cortar_no).await {
                Ok((complex, articles)) => {
                    debug!(complex_no = %complex_no, articles = articles.len(), "Complex collected");
                    collection.complexes.push(complex);
                    collection.articles.extend(articles);
                }
                Err(e) => {
                    error!(complex_no = %complex_no, error = %e, "Complex skipped");
                    collection.failed += 1;
                }
            }
        }
    }

    info!(
        complexes = collection.complexes.len(),
        articles = collection.articles.len(),
        failed = collection.failed,
        "Region collected"
    );
    Ok(collection)
}

async fn collect_complex<A: ListingApi>(
    api: &A,
    complex_no: &str,
    cortar_no: &str,
) -> Result<(Complex, Vec<Article>)> {
    let complex = api.complex_detail(complex_no, cortar_no).await?;

    let mut articles = Vec::new();
    let mut page = 1;
    loop {
        let batch = api.articles(complex_no, page).await?;
        if batch.articles.is_empty() {
            break;
        }
        debug!(complex_no, page, count = batch.articles.len(), "Article page received");
        articles.extend(batch.articles.into_iter().map(|mut article| {
            article.complex_name = complex.complex_name.clone();
            article
        }));

        if !batch.has_more {
            break;
        }
        if page >= MAX_ARTICLE_PAGES {
            warn!(complex_no, page, "Article page limit reached");
            break;
        }
        page += 1;
    }

    Ok((complex, articles))
}
