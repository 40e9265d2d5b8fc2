//! Crime records from the crime service's HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use region_map_crime_models::CrimeRecord;

use crate::retry::{self, RetryPolicy};
use crate::{CrimeDataSource, SourceError};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches `GET <base_url>/crimes/all`.
#[derive(Debug, Clone)]
pub struct HttpCrimeDataSource {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl HttpCrimeDataSource {
    /// Creates a source for the service rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: endpoint(base_url),
            retry: RetryPolicy::default(),
        })
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The full endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CrimeDataSource for HttpCrimeDataSource {
    fn name(&self) -> String {
        self.url.clone()
    }

    async fn fetch_all(&self) -> Result<Vec<CrimeRecord>, SourceError> {
        retry::send_json(&self.retry, || self.client.get(&self.url)).await
    }
}

/// Joins the base URL and the records path without doubling slashes.
fn endpoint(base_url: &str) -> String {
    format!("{}/crimes/all", base_url.trim_end_matches('/'))
}
