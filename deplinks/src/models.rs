//! Data models for search results, dependency rows and the summary matrix.

use serde::{Deserialize, Serialize};

/// One matched file returned by the code search source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultRecord {
    /// Project key as reported by the source.
    pub project: String,
    /// Repository name.
    pub repo: String,
    /// Directory path of the matched file within the repository.
    #[serde(default)]
    pub filepath: String,
    /// Matched file's name.
    pub filename: String,
    /// Human-readable timestamp of the file's most recent commit.
    #[serde(default)]
    pub last_commit_time: String,
    /// Code snippet in which the matches were found.
    #[serde(default)]
    pub raw_snippet: Option<String>,
}

impl SearchResultRecord {
    /// Creates a record without a snippet.
    #[must_use]
    pub fn new(
        project: impl Into<String>,
        repo: impl Into<String>,
        filepath: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            repo: repo.into(),
            filepath: filepath.into(),
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Sets the snippet text.
    #[must_use]
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.raw_snippet = Some(snippet.into());
        self
    }

    /// Sets the last commit time.
    #[must_use]
    pub fn with_last_commit_time(mut self, time: impl Into<String>) -> Self {
        self.last_commit_time = time.into();
        self
    }

    /// `repo/filepath/filename`, used in log messages.
    #[must_use]
    pub fn location(&self) -> String {
        format!("{}/{}{}", self.repo, self.filepath, self.filename)
    }
}

/// Classification of a single extracted link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkClassification {
    /// Absolute URL with its scheme forced to `https`.
    pub link: String,
    /// Host portion of the link.
    pub netloc: String,
    /// Path portion of the link.
    pub path: String,
    /// Inferred downstream service.
    pub service: String,
    /// Vocabulary keywords found in the link, in vocabulary order.
    pub keywords: Vec<String>,
}

/// One row of the dependency table: a single link found in a single file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyLinkRecord {
    /// Project key.
    pub project: String,
    /// Repository name.
    pub repo: String,
    /// Directory path of the file.
    pub filepath: String,
    /// File name.
    pub filename: String,
    /// Last commit time of the file.
    pub last_commit_time: String,
    /// The link. Empty on the placeholder row emitted for files without links.
    pub link: String,
    /// Host portion of the link.
    pub netloc: String,
    /// Path portion of the link.
    pub path: String,
    /// Inferred downstream service.
    pub service: String,
    /// Vocabulary keywords found in the link.
    pub keywords: Vec<String>,
}

impl DependencyLinkRecord {
    /// Builds a row from its source record and a link classification.
    #[must_use]
    pub fn from_parts(source: &SearchResultRecord, classification: LinkClassification) -> Self {
        let LinkClassification {
            link,
            netloc,
            path,
            service,
            keywords,
        } = classification;
        Self {
            project: source.project.clone(),
            repo: source.repo.clone(),
            filepath: source.filepath.clone(),
            filename: source.filename.clone(),
            last_commit_time: source.last_commit_time.clone(),
            link,
            netloc,
            path,
            service,
            keywords,
        }
    }

    /// Builds the placeholder row for a source record with no links.
    #[must_use]
    pub fn placeholder(source: &SearchResultRecord) -> Self {
        Self::from_parts(source, LinkClassification::default())
    }

    /// Whether this row carries a link.
    #[must_use]
    pub fn has_link(&self) -> bool {
        !self.link.is_empty()
    }

    /// Renders the keyword set as a bracketed list, e.g. `['rumba', 'config']`.
    #[must_use]
    pub fn keywords_display(&self) -> String {
        let quoted: Vec<String> = self.keywords.iter().map(|k| format!("'{k}'")).collect();
        format!("[{}]", quoted.join(", "))
    }
}

/// Number of links from one repository to one service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct DependencySummaryEntry {
    /// Repository name.
    pub repo: String,
    /// Service name.
    pub service: String,
    /// Number of surviving rows with this `(repo, service)` key.
    pub count: usize,
}

/// The repo x service count matrix for one project, ordered by key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencySummary {
    /// Entries ordered by `(repo, service)`.
    pub entries: Vec<DependencySummaryEntry>,
}

impl DependencySummary {
    /// Total number of links counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Number of distinct `(repo, service)` keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the summary has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count for a key, if present.
    #[must_use]
    pub fn count(&self, repo: &str, service: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.repo == repo && e.service == service)
            .map(|e| e.count)
    }
}
