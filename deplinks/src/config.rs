//! Configuration types for scanning and fetching.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{DeplinksError, Result};

/// Top-level configuration for a dependency scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanConfig {
    /// Drop links whose keyword set is empty (links to services outside the
    /// vocabulary, and image links).
    #[serde(default = "default_true")]
    pub filter_external_services: bool,
    /// Vocabulary of internal service keywords, matched case-sensitively.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Suffix appended to `project:<KEY>` when querying the search source.
    #[serde(default = "default_query_suffix")]
    pub query_suffix: String,
    /// File names whose rows are always dropped.
    #[serde(default = "default_excluded_filenames")]
    pub excluded_filenames: Vec<String>,
    /// Path substrings marking a link as an image.
    #[serde(default = "default_image_markers")]
    pub image_markers: Vec<String>,
    /// Timeout for retrieving one project's results, in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: f64,
    /// Directory the CSV artifacts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Bitbucket code search settings.
    #[serde(default)]
    pub bitbucket: BitbucketConfig,
}

fn default_true() -> bool {
    true
}

fn default_keywords() -> Vec<String> {
    [
        "rumba",
        "easybridge",
        "goldengate",
        "telemetry",
        "savvas",
        "pearson",
        "realize",
        "bitbucket",
        "config",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_query_suffix() -> String {
    "properties https".to_string()
}

fn default_excluded_filenames() -> Vec<String> {
    vec!["README.md".to_string()]
}

fn default_image_markers() -> Vec<String> {
    vec!["jpg".to_string(), "png".to_string()]
}

fn default_fetch_timeout() -> f64 {
    60.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            filter_external_services: true,
            keywords: default_keywords(),
            query_suffix: default_query_suffix(),
            excluded_filenames: default_excluded_filenames(),
            image_markers: default_image_markers(),
            fetch_timeout_seconds: default_fetch_timeout(),
            output_dir: default_output_dir(),
            bitbucket: BitbucketConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Creates a new scan configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Parses a configuration from a JSON string and validates it.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Enables or disables external-service filtering.
    #[must_use]
    pub fn with_filter_external_services(mut self, enabled: bool) -> Self {
        self.filter_external_services = enabled;
        self
    }

    /// Replaces the keyword vocabulary.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the query suffix.
    #[must_use]
    pub fn with_query_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.query_suffix = suffix.into();
        self
    }

    /// Sets the fetch timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, seconds: f64) -> Self {
        self.fetch_timeout_seconds = seconds;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Gets the fetch timeout as a Duration.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        positive_duration(self.fetch_timeout_seconds, default_fetch_timeout())
    }

    /// Builds the code search query for a project key.
    #[must_use]
    pub fn search_query(&self, project_key: &str) -> String {
        let suffix = self.query_suffix.trim();
        if suffix.is_empty() {
            format!("project:{project_key}")
        } else {
            format!("project:{project_key} {suffix}")
        }
    }

    /// Checks the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.fetch_timeout_seconds.is_finite() || self.fetch_timeout_seconds <= 0.0 {
            return Err(DeplinksError::Config(format!(
                "fetch_timeout_seconds must be positive, got {}",
                self.fetch_timeout_seconds
            )));
        }
        if self.keywords.iter().any(|k| k.is_empty()) {
            return Err(DeplinksError::Config(
                "keywords must not contain empty strings".to_string(),
            ));
        }
        if self.image_markers.iter().any(|m| m.is_empty()) {
            return Err(DeplinksError::Config(
                "image_markers must not contain empty strings".to_string(),
            ));
        }
        self.bitbucket.validate()
    }
}

/// Settings for the Bitbucket Server code search source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BitbucketConfig {
    /// Base URL of the Bitbucket Server instance.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Number of code results requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Whether to look up the last commit time of each matched file.
    #[serde(default = "default_true")]
    pub lookup_commit_times: bool,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:7990".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_request_timeout() -> f64 {
    30.0
}

/// Converts seconds to a `Duration`, using `fallback` for values that are
/// not positive or do not fit.
fn positive_duration(seconds: f64, fallback: f64) -> Duration {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) if !duration.is_zero() => duration,
        _ => Duration::from_secs_f64(fallback),
    }
}

fn default_user_agent() -> String {
    format!("deplinks/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            lookup_commit_times: true,
            request_timeout_seconds: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl BitbucketConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Gets the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        positive_duration(self.request_timeout_seconds, default_request_timeout())
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(DeplinksError::Config(
                "bitbucket.page_size must be at least 1".to_string(),
            ));
        }
        if !self.request_timeout_seconds.is_finite() || self.request_timeout_seconds <= 0.0 {
            return Err(DeplinksError::Config(format!(
                "bitbucket.request_timeout_seconds must be positive, got {}",
                self.request_timeout_seconds
            )));
        }
        url::Url::parse(&self.base_url).map_err(|e| {
            DeplinksError::Config(format!("bitbucket.base_url {:?}: {e}", self.base_url))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert!(config.filter_external_services);
        assert_eq!(config.keywords.len(), 9);
        assert_eq!(config.keywords[0], "rumba");
        assert_eq!(config.keywords[8], "config");
        assert_eq!(config.excluded_filenames, vec!["README.md".to_string()]);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_query() {
        let config = ScanConfig::default();
        assert_eq!(config.search_query("REAL"), "project:REAL properties https");

        let bare = ScanConfig::default().with_query_suffix("  ");
        assert_eq!(bare.search_query("ESB"), "project:ESB");
    }

    #[test]
    fn test_from_json_partial() {
        let config = ScanConfig::from_json_str(
            r#"{"filter_external_services": false, "keywords": ["realize"]}"#,
        )
        .unwrap();
        assert!(!config.filter_external_services);
        assert_eq!(config.keywords, vec!["realize".to_string()]);
        assert_eq!(config.query_suffix, "properties https");
        assert_eq!(config.bitbucket.page_size, 100);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deplinks.json");
        std::fs::write(
            &path,
            r#"{"bitbucket": {"base_url": "https://bitbucket.internal"}}"#,
        )
        .unwrap();

        let config = ScanConfig::from_json_file(&path).unwrap();
        assert_eq!(config.bitbucket.base_url, "https://bitbucket.internal");
        assert!(config.bitbucket.lookup_commit_times);
    }

    #[test]
    fn test_validate_rejects_bad_timeout() {
        let config = ScanConfig::default().with_fetch_timeout(0.0);
        assert!(matches!(config.validate(), Err(DeplinksError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_keyword() {
        let config = ScanConfig::default().with_keywords(["rumba", ""]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = ScanConfig::default();
        config.bitbucket = config.bitbucket.with_base_url("not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_root_trims_slash() {
        let config = BitbucketConfig::default().with_base_url("https://bb.example.com/");
        assert_eq!(config.api_root(), "https://bb.example.com");
    }

    #[test]
    fn test_invalid_timeouts_fall_back_to_defaults() {
        for seconds in [-1.0, 0.0, f64::NAN, f64::INFINITY, 1e30] {
            let config = ScanConfig::default().with_fetch_timeout(seconds);
            assert_eq!(config.fetch_timeout(), Duration::from_secs(60));
        }

        let mut config = ScanConfig::default();
        config.bitbucket.request_timeout_seconds = -5.0;
        assert_eq!(config.bitbucket.request_timeout(), Duration::from_secs(30));
        assert_eq!(
            ScanConfig::default().with_fetch_timeout(2.5).fetch_timeout(),
            Duration::from_millis(2500)
        );
    }
}
