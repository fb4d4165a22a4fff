use crate::fetch::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that adds a fixed set of headers to every request.
///
/// Headers already set on the request win over the defaults.
pub struct WithHeaders<C> {
    pub inner: C,
    pub headers: HeaderMap,
}

impl<C> WithHeaders<C> {
    /// Builds the wrapper from `(name, value)` pairs.
    pub fn new(inner: C, pairs: &[(&str, &str)]) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        Ok(Self { inner, headers })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for WithHeaders<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        for (name, value) in &self.headers {
            if !req.headers().contains_key(name) {
                req.headers_mut().insert(name.clone(), value.clone());
            }
        }
        self.inner.execute(req).await
    }
}
