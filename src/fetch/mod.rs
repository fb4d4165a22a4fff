//! HTTP plumbing for the listing collector.
//!
//! [`HttpClient`] is the seam the collector is written against; wrappers such
//! as [`WithHeaders`] stack on top of [`BasicClient`].

mod basic;
mod headers;

pub use basic::BasicClient;
pub use headers::WithHeaders;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Request, Response};
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Pacing and retry settings for API calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait before retry `n` is `backoff_base * 2^n`.
    pub backoff_base: Duration,
    /// Pause after every successful request.
    pub request_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            request_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// GETs `url` as JSON, retrying failed attempts with exponential backoff.
#[tracing::instrument(skip(client, policy))]
pub async fn fetch_json<C: HttpClient>(
    client: &C,
    url: &str,
    policy: &RetryPolicy,
) -> Result<serde_json::Value> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let result = async {
            let bytes = fetch_bytes(client, url).await?;
            Ok::<serde_json::Value, anyhow::Error>(serde_json::from_slice(&bytes)?)
        }
        .await;

        match result {
            Ok(value) => {
                debug!(attempt = attempt + 1, "Request succeeded");
                tokio::time::sleep(policy.request_delay).await;
                return Ok(value);
            }
            Err(e) if attempt + 1 < attempts => {
                let wait = policy.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("GET {url} failed after {attempts} attempts"));
            }
        }
    }
}
