//! # Deplinks
//!
//! An inventory of cross-service dependencies declared as URLs in source code.
//!
//! Deplinks reads code search results for one or more project keys, pulls every
//! outbound URL out of the matched snippets, works out which downstream service
//! each URL points at, and writes two tables per project:
//!
//! - **Frame**: one row per link with its repository, file, host, path,
//!   service and matched keywords
//! - **Pivot**: link counts per (repository, service) pair
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deplinks::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ScanConfig::default();
//! let pipeline = DependencyPipeline::new(
//!     config,
//!     Arc::new(JsonFileSource::new("exports")),
//!     Arc::new(CsvSink::new("reports")),
//! );
//!
//! let batch = pipeline.scan_batch(&["REAL", "ESB"], &CancellationToken::new()).await;
//! assert!(batch.is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod aggregate;
pub mod cancellation;
pub mod classify;
pub mod config;
pub mod errors;
pub mod extract;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod sink;
pub mod source;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregate::summarize;
    pub use crate::cancellation::CancellationToken;
    pub use crate::classify::UrlClassifier;
    pub use crate::config::{BitbucketConfig, ScanConfig};
    pub use crate::errors::{DeplinksError, Result};
    pub use crate::extract::{extract_links, LinkMatch};
    pub use crate::filter::{FilterPipeline, FilterReport, FilterStage};
    pub use crate::models::{
        DependencyLinkRecord, DependencySummary, DependencySummaryEntry, LinkClassification,
        SearchResultRecord,
    };
    pub use crate::normalize::RecordNormalizer;
    pub use crate::pipeline::{
        BatchReport, DependencyPipeline, ProjectReport, ProjectStatus, ProjectTables,
    };
    pub use crate::sink::{CollectingSink, CsvSink, OutputSink, ProjectArtifacts};
    #[cfg(feature = "bitbucket")]
    pub use crate::source::BitbucketSource;
    pub use crate::source::{
        AnonymousAuthenticator, Authenticator, BasicAuthenticator, InMemorySource,
        JsonFileSource, SearchSource, Session,
    };
}
