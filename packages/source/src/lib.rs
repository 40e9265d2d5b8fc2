#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crime data source trait and implementations.
//!
//! The viewer asks a [`CrimeDataSource`] for every crime record once per
//! session. The source may fail or be slow; [`load_crime_data`] turns any
//! failure into an empty dataset so the overlay and detail panel simply
//! show "no data".

pub mod file;
pub mod http;
pub mod retry;

use std::path::PathBuf;

use async_trait::async_trait;
use region_map_crime_models::{CrimeDataMap, CrimeRecord, index_by_region};

pub use file::FileCrimeDataSource;
pub use http::HttpCrimeDataSource;
pub use retry::RetryPolicy;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {status}")]
    Status {
        /// The status code received.
        status: u16,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait that all crime data sources must implement.
#[async_trait]
pub trait CrimeDataSource: Send + Sync {
    /// Returns a human-readable description of this source for logs.
    fn name(&self) -> String;

    /// Fetches every crime record. No parameters, no pagination: the whole
    /// dataset arrives in one call.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the data cannot be fetched or decoded.
    async fn fetch_all(&self) -> Result<Vec<CrimeRecord>, SourceError>;
}

/// A source with no data, used when nothing is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCrimeDataSource;

#[async_trait]
impl CrimeDataSource for EmptyCrimeDataSource {
    fn name(&self) -> String {
        "none".to_owned()
    }

    async fn fetch_all(&self) -> Result<Vec<CrimeRecord>, SourceError> {
        Ok(Vec::new())
    }
}

/// Fetches all records and indexes them by region.
///
/// Never fails: any error is logged and replaced by an empty map, without
/// partial results.
pub async fn load_crime_data(source: &dyn CrimeDataSource) -> CrimeDataMap {
    log::info!("Fetching crime data from {}...", source.name());
    match source.fetch_all().await {
        Ok(records) => {
            let map = index_by_region(records);
            log::info!("Loaded crime data for {} regions", map.len());
            map
        }
        Err(e) => {
            log::warn!("Crime data unavailable, continuing without it: {e}");
            CrimeDataMap::new()
        }
    }
}

/// Where crime data comes from, resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// `GET <base_url>/crimes/all`.
    Http {
        /// Base URL of the crime service.
        base_url: String,
        /// Retry behaviour for transient failures.
        retry: RetryPolicy,
    },
    /// A local JSON file with the same shape as the HTTP response.
    File {
        /// Path to the JSON file.
        path: PathBuf,
    },
    /// No source configured.
    None,
}

impl SourceConfig {
    /// Reads `CRIME_DATA_URL`, `CRIME_DATA_RETRIES`, and `CRIME_DATA_FILE`.
    ///
    /// A URL takes precedence over a file.
    #[must_use]
    pub fn from_env() -> Self {
        if let Ok(base_url) = std::env::var("CRIME_DATA_URL") {
            let mut retry = RetryPolicy::default();
            if let Some(n) = std::env::var("CRIME_DATA_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
            {
                retry.max_retries = n;
            }
            return Self::Http { base_url, retry };
        }
        if let Ok(path) = std::env::var("CRIME_DATA_FILE") {
            return Self::File {
                path: PathBuf::from(path),
            };
        }
        Self::None
    }

    /// Builds the configured source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the HTTP client cannot be built.
    pub fn build(&self) -> Result<Box<dyn CrimeDataSource>, SourceError> {
        Ok(match self {
            Self::Http { base_url, retry } => {
                Box::new(HttpCrimeDataSource::new(base_url)?.with_retry(*retry))
            }
            Self::File { path } => Box::new(FileCrimeDataSource::new(path.clone())),
            Self::None => Box::new(EmptyCrimeDataSource),
        })
    }
}
