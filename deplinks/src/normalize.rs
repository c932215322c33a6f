//! Turns raw search results into one dependency row per link.

use tracing::debug;

use crate::classify::UrlClassifier;
use crate::config::ScanConfig;
use crate::errors::DeplinksError;
use crate::extract::extract_from_snippet;
use crate::models::{DependencyLinkRecord, SearchResultRecord};

/// Explodes search results into classified dependency rows.
#[derive(Debug, Clone, Default)]
pub struct RecordNormalizer {
    classifier: UrlClassifier,
}

impl RecordNormalizer {
    /// Creates a normalizer around a classifier.
    #[must_use]
    pub const fn new(classifier: UrlClassifier) -> Self {
        Self { classifier }
    }

    /// Creates a normalizer from the scan configuration.
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(UrlClassifier::from_config(config))
    }

    /// The classifier used for each link.
    #[must_use]
    pub const fn classifier(&self) -> &UrlClassifier {
        &self.classifier
    }

    /// Produces the rows for one search result.
    ///
    /// A result without links (or without a snippet) yields a single
    /// placeholder row with an empty link.
    #[must_use]
    pub fn normalize(&self, record: &SearchResultRecord) -> Vec<DependencyLinkRecord> {
        let record = strip_identifiers(record);
        if record.raw_snippet.is_none() {
            let missing = DeplinksError::missing_field("rawSnippet", record.location());
            debug!(error = %missing, "Treating result as having no links");
        }

        let rows: Vec<DependencyLinkRecord> = extract_from_snippet(record.raw_snippet.as_deref())
            .map(|m| DependencyLinkRecord::from_parts(&record, self.classifier.classify(&m)))
            .collect();

        if rows.is_empty() {
            vec![DependencyLinkRecord::placeholder(&record)]
        } else {
            rows
        }
    }

    /// Produces the rows for a whole result set, preserving input order.
    #[must_use]
    pub fn normalize_all(&self, records: &[SearchResultRecord]) -> Vec<DependencyLinkRecord> {
        records.iter().flat_map(|r| self.normalize(r)).collect()
    }
}

/// Removes all whitespace from the project, repo and filename fields.
#[must_use]
pub fn strip_identifiers(record: &SearchResultRecord) -> SearchResultRecord {
    SearchResultRecord {
        project: strip_whitespace(&record.project),
        repo: strip_whitespace(&record.repo),
        filename: strip_whitespace(&record.filename),
        ..record.clone()
    }
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}
