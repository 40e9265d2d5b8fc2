//! Crime records from a local JSON file, for offline runs.

use std::path::PathBuf;

use async_trait::async_trait;
use region_map_crime_models::CrimeRecord;

use crate::{CrimeDataSource, SourceError};

/// Reads a JSON array of records from disk.
#[derive(Debug, Clone)]
pub struct FileCrimeDataSource {
    path: PathBuf,
}

impl FileCrimeDataSource {
    /// Creates a source reading `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl CrimeDataSource for FileCrimeDataSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_all(&self) -> Result<Vec<CrimeRecord>, SourceError> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
