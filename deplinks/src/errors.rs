//! Error types for the deplinks pipeline.
//!
//! Nothing in the pipeline is fatal to a batch: source failures degrade to an
//! empty result set, URL parse failures degrade to empty host/path fields, and
//! missing fields degrade to "no links". The variants below exist so that
//! those recoveries can be logged and reported per project key.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DeplinksError>;

/// The main error type for deplinks operations.
#[derive(Debug, Error)]
pub enum DeplinksError {
    /// The search source could not be reached or returned no usable data.
    #[error("Search source unavailable for project {project}: {reason}")]
    SourceUnavailable {
        /// Project key being fetched.
        project: String,
        /// Human-readable cause.
        reason: String,
    },

    /// The search source did not answer within the configured timeout.
    #[error("Search source timed out after {seconds}s for project {project}")]
    SourceTimeout {
        /// Project key being fetched.
        project: String,
        /// Timeout that elapsed.
        seconds: f64,
    },

    /// A matched link could not be decomposed into a URL.
    #[error("Could not parse URL {url}: {reason}")]
    ParseFailure {
        /// The reconstructed URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// A field expected on a raw search result was absent.
    #[error("Missing field {field} on {context}")]
    MissingField {
        /// Name of the field.
        field: &'static str,
        /// Where the field was expected (repo/file).
        context: String,
    },

    /// Authentication against the search system failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error.
    #[cfg(feature = "bitbucket")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl DeplinksError {
    /// Creates a source-unavailable error.
    pub fn source_unavailable(project: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            project: project.into(),
            reason: reason.into(),
        }
    }

    /// Creates a parse-failure error.
    pub fn parse_failure(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ParseFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a missing-field error.
    pub fn missing_field(field: &'static str, context: impl Into<String>) -> Self {
        Self::MissingField {
            field,
            context: context.into(),
        }
    }

    /// Whether the pipeline recovers from this error by degrading the output
    /// for a single project key (as opposed to failing that key's artifacts).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. }
                | Self::SourceTimeout { .. }
                | Self::ParseFailure { .. }
                | Self::MissingField { .. }
                | Self::Authentication(_)
        )
    }
}
