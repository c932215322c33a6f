//! In-memory search source.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use super::protocols::SearchSource;
use crate::errors::{DeplinksError, Result};
use crate::models::SearchResultRecord;

/// A search source serving canned results per project key.
///
/// Records every key it is asked for, can be told to fail for specific keys,
/// and can delay its answers to exercise fetch timeouts.
#[derive(Debug, Default)]
pub struct InMemorySource {
    results: HashMap<String, Vec<SearchResultRecord>>,
    failures: HashMap<String, String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl InMemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds results for a project key.
    #[must_use]
    pub fn with_results(mut self, project_key: impl Into<String>, records: Vec<SearchResultRecord>) -> Self {
        self.results.entry(project_key.into()).or_default().extend(records);
        self
    }

    /// Makes fetches for a project key fail.
    #[must_use]
    pub fn with_failure(mut self, project_key: impl Into<String>, reason: impl Into<String>) -> Self {
        self.failures.insert(project_key.into(), reason.into());
        self
    }

    /// Delays every fetch.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Project keys fetched so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SearchSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_search_results(&self, project_key: &str) -> Result<Vec<SearchResultRecord>> {
        self.calls.lock().push(project_key.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.failures.get(project_key) {
            return Err(DeplinksError::source_unavailable(project_key, reason.clone()));
        }
        Ok(self.results.get(project_key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_results_per_key() {
        let source = InMemorySource::new()
            .with_results("REAL", vec![SearchResultRecord::new("REAL", "r", "", "a")])
            .with_results("REAL", vec![SearchResultRecord::new("REAL", "r", "", "b")]);

        assert_eq!(source.fetch_search_results("REAL").await.unwrap().len(), 2);
        assert!(source.fetch_search_results("ESB").await.unwrap().is_empty());
        assert_eq!(source.calls(), vec!["REAL".to_string(), "ESB".to_string()]);
    }

    #[tokio::test]
    async fn test_failure() {
        let source = InMemorySource::new().with_failure("RR", "login page never loaded");
        let err = source.fetch_search_results("RR").await.unwrap_err();
        assert!(matches!(err, DeplinksError::SourceUnavailable { .. }));
    }
}
