//! Orchestration of one project key and of a batch of keys.

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

use super::report::{BatchReport, ProjectReport, ProjectStatus};
use crate::aggregate::summarize;
use crate::cancellation::CancellationToken;
use crate::config::ScanConfig;
use crate::errors::DeplinksError;
use crate::filter::{FilterPipeline, FilterReport};
use crate::models::{DependencyLinkRecord, DependencySummary, SearchResultRecord};
use crate::normalize::RecordNormalizer;
use crate::sink::OutputSink;
use crate::source::SearchSource;

/// The filtered table and summary for one project's results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectTables {
    /// Rows surviving the filter pipeline.
    pub table: Vec<DependencyLinkRecord>,
    /// Repo x service counts over `table`.
    pub summary: DependencySummary,
    /// Rows before filtering.
    pub exploded: usize,
    /// Per-stage drop counts.
    pub filter: FilterReport,
}

/// Runs the extraction pipeline for project keys against a source and sink.
pub struct DependencyPipeline {
    config: ScanConfig,
    normalizer: RecordNormalizer,
    filter: FilterPipeline,
    source: Arc<dyn SearchSource>,
    sink: Arc<dyn OutputSink>,
}

impl std::fmt::Debug for DependencyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyPipeline")
            .field("source", &self.source.name())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl DependencyPipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(config: ScanConfig, source: Arc<dyn SearchSource>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            normalizer: RecordNormalizer::from_config(&config),
            filter: FilterPipeline::from_config(&config),
            config,
            source,
            sink,
        }
    }

    /// The scan configuration.
    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Normalizes, filters and aggregates a result set. No IO.
    #[must_use]
    pub fn process(&self, records: &[SearchResultRecord]) -> ProjectTables {
        let rows = self.normalizer.normalize_all(records);
        let exploded = rows.len();
        let (table, filter) = self.filter.apply(rows);
        let summary = summarize(&table);
        ProjectTables {
            table,
            summary,
            exploded,
            filter,
        }
    }

    /// Fetches a project's results under the configured timeout.
    ///
    /// Failures and timeouts yield an empty result set plus the error that was
    /// recovered from.
    pub async fn fetch(&self, project_key: &str) -> (Vec<SearchResultRecord>, Option<DeplinksError>) {
        let timeout = self.config.fetch_timeout();
        match tokio::time::timeout(timeout, self.source.fetch_search_results(project_key)).await {
            Ok(Ok(records)) => (records, None),
            Ok(Err(err)) => (Vec::new(), Some(err)),
            Err(_) => (
                Vec::new(),
                Some(DeplinksError::SourceTimeout {
                    project: project_key.to_string(),
                    seconds: timeout.as_secs_f64(),
                }),
            ),
        }
    }

    /// Scans one project key and writes its artifacts.
    pub async fn scan_project(&self, project_key: &str) -> ProjectReport {
        let span = info_span!("project", key = %project_key, source = self.source.name());
        self.scan_project_inner(project_key).instrument(span).await
    }

    async fn scan_project_inner(&self, project_key: &str) -> ProjectReport {
        let started = Instant::now();
        info!("Fetching search results");

        let (records, source_error) = self.fetch(project_key).await;
        match &source_error {
            Some(err) if err.is_recoverable() => {
                warn!(error = %err, "Proceeding with an empty result set");
            }
            Some(err) => error!(error = %err, "Unreadable source, proceeding with an empty result set"),
            None => {}
        }

        let tables = self.process(&records);
        info!(
            fetched = records.len(),
            exploded = tables.exploded,
            no_links = tables.filter.no_links,
            external_service = tables.filter.external_service,
            excluded_file = tables.filter.excluded_file,
            kept = tables.table.len(),
            "Filtered dependency table"
        );

        let (artifacts, sink_error) =
            match self.sink.write_project(project_key, &tables.table, &tables.summary) {
                Ok(artifacts) => (Some(artifacts), None),
                Err(err) => {
                    warn!(error = %err, "Could not write artifacts");
                    (None, Some(err.to_string()))
                }
            };

        let status = if sink_error.is_some() {
            ProjectStatus::Failed
        } else if source_error.is_some() {
            ProjectStatus::Degraded
        } else {
            ProjectStatus::Completed
        };

        ProjectReport {
            project_key: project_key.to_string(),
            status,
            fetched: records.len(),
            exploded: tables.exploded,
            filter: tables.filter,
            summary_entries: tables.summary.len(),
            artifacts,
            source_error: source_error.map(|e| e.to_string()),
            sink_error,
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Scans each key in turn.
    ///
    /// Keys are trimmed and blank keys ignored. Once `cancel` is set, the
    /// remaining keys are reported as skipped.
    pub async fn scan_batch<S: AsRef<str>>(&self, project_keys: &[S], cancel: &CancellationToken) -> BatchReport {
        let mut batch = BatchReport::start();
        let keys: Vec<&str> = project_keys
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .collect();
        info!(run_id = %batch.run_id, projects = keys.len(), "Starting batch");

        for key in keys {
            if cancel.is_cancelled() {
                batch.cancelled = true;
                batch.projects.push(ProjectReport::skipped(key));
                continue;
            }
            let report = self.scan_project(key).await;
            info!(
                project = %key,
                status = report.status.as_str(),
                rows = report.kept(),
                "Project finished"
            );
            batch.projects.push(report);
        }

        batch.finish();
        info!(
            run_id = %batch.run_id,
            total_rows = batch.total_rows(),
            cancelled = batch.cancelled,
            "Batch finished"
        );
        batch
    }
}
