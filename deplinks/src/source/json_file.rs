//! Search source reading exported results from JSON files.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::protocols::SearchSource;
use crate::errors::{DeplinksError, Result};
use crate::models::SearchResultRecord;

/// Reads `<dir>/<KEY>.json`, a JSON array of search results.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    /// Creates a source rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the export for a project key.
    #[must_use]
    pub fn path_for(&self, project_key: &str) -> PathBuf {
        self.dir.join(format!("{project_key}.json"))
    }

    /// Directory the exports are read from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SearchSource for JsonFileSource {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn fetch_search_results(&self, project_key: &str) -> Result<Vec<SearchResultRecord>> {
        let path = self.path_for(project_key);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            DeplinksError::source_unavailable(project_key, format!("{}: {e}", path.display()))
        })?;
        let records: Vec<SearchResultRecord> = serde_json::from_str(&raw)?;
        Ok(records)
    }
}
