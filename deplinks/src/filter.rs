//! Row-drop predicates applied to the exploded dependency table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScanConfig;
use crate::models::DependencyLinkRecord;

/// The stages of the filter pipeline, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    /// The source result contained no links.
    NoLinks,
    /// The link matched no vocabulary keyword (or was an image).
    ExternalService,
    /// The file name is excluded (README files).
    ExcludedFile,
}

impl FilterStage {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoLinks => "no_links",
            Self::ExternalService => "external_service",
            Self::ExcludedFile => "excluded_file",
        }
    }
}

/// Number of rows dropped by each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    /// Rows seen.
    pub input: usize,
    /// Placeholder rows without a link.
    pub no_links: usize,
    /// Rows without vocabulary keywords.
    pub external_service: usize,
    /// Rows from excluded files.
    pub excluded_file: usize,
}

impl FilterReport {
    /// Rows that survived every stage.
    #[must_use]
    pub const fn kept(&self) -> usize {
        self.input - self.dropped()
    }

    /// Rows dropped by any stage.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.no_links + self.external_service + self.excluded_file
    }

    fn record(&mut self, stage: FilterStage) {
        match stage {
            FilterStage::NoLinks => self.no_links += 1,
            FilterStage::ExternalService => self.external_service += 1,
            FilterStage::ExcludedFile => self.excluded_file += 1,
        }
    }
}

/// Ordered, independent row predicates.
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    filter_external_services: bool,
    excluded_filenames: Vec<String>,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl FilterPipeline {
    /// Creates a filter pipeline.
    #[must_use]
    pub const fn new(filter_external_services: bool, excluded_filenames: Vec<String>) -> Self {
        Self {
            filter_external_services,
            excluded_filenames,
        }
    }

    /// Creates a filter pipeline from the scan configuration.
    #[must_use]
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            config.filter_external_services,
            config.excluded_filenames.clone(),
        )
    }

    /// Whether external-service filtering is enabled.
    #[must_use]
    pub const fn filters_external_services(&self) -> bool {
        self.filter_external_services
    }

    /// Returns the first stage that drops `row`, or `None` if it survives.
    #[must_use]
    pub fn rejecting_stage(&self, row: &DependencyLinkRecord) -> Option<FilterStage> {
        if !row.has_link() {
            return Some(FilterStage::NoLinks);
        }
        if self.filter_external_services && row.keywords.is_empty() {
            return Some(FilterStage::ExternalService);
        }
        if self.excluded_filenames.iter().any(|f| *f == row.filename) {
            return Some(FilterStage::ExcludedFile);
        }
        None
    }

    /// Whether `row` survives every stage.
    #[must_use]
    pub fn keeps(&self, row: &DependencyLinkRecord) -> bool {
        self.rejecting_stage(row).is_none()
    }

    /// Filters a table, returning the surviving rows and per-stage drop counts.
    #[must_use]
    pub fn apply(&self, rows: Vec<DependencyLinkRecord>) -> (Vec<DependencyLinkRecord>, FilterReport) {
        let mut report = FilterReport {
            input: rows.len(),
            ..FilterReport::default()
        };

        let kept = rows
            .into_iter()
            .filter(|row| match self.rejecting_stage(row) {
                Some(stage) => {
                    debug!(
                        stage = stage.as_str(),
                        repo = %row.repo,
                        filename = %row.filename,
                        link = %row.link,
                        "Dropping row"
                    );
                    report.record(stage);
                    false
                }
                None => true,
            })
            .collect();

        (kept, report)
    }
}
