//! Per-project and per-batch run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::FilterReport;
use crate::sink::ProjectArtifacts;

/// Outcome of one project key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Results fetched, artifacts written.
    Completed,
    /// The source failed; empty artifacts were written instead.
    Degraded,
    /// The artifacts could not be written.
    Failed,
    /// The batch was cancelled before this key ran.
    Skipped,
}

impl ProjectStatus {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// What happened while scanning one project key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReport {
    /// Project key.
    pub project_key: String,
    /// Outcome.
    pub status: ProjectStatus,
    /// Search results returned by the source.
    pub fetched: usize,
    /// Rows after exploding results into one row per link.
    pub exploded: usize,
    /// Per-stage drop counts.
    pub filter: FilterReport,
    /// Distinct `(repo, service)` keys in the summary.
    pub summary_entries: usize,
    /// Where the artifacts were written.
    pub artifacts: Option<ProjectArtifacts>,
    /// Source failure that was recovered from, if any.
    pub source_error: Option<String>,
    /// Sink failure, if any.
    pub sink_error: Option<String>,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
}

impl ProjectReport {
    /// A report for a key skipped by cancellation.
    #[must_use]
    pub fn skipped(project_key: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            status: ProjectStatus::Skipped,
            fetched: 0,
            exploded: 0,
            filter: FilterReport::default(),
            summary_entries: 0,
            artifacts: None,
            source_error: None,
            sink_error: None,
            duration_ms: 0.0,
        }
    }

    /// Rows in the exported table.
    #[must_use]
    pub const fn kept(&self) -> usize {
        self.filter.kept()
    }
}

/// What happened across a batch of project keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Identifier of this run.
    pub run_id: Uuid,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// When the batch finished.
    pub finished_at: DateTime<Utc>,
    /// One report per requested key, in request order.
    pub projects: Vec<ProjectReport>,
    /// Whether the batch was cancelled.
    pub cancelled: bool,
}

impl BatchReport {
    /// Starts an empty report.
    #[must_use]
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            projects: Vec::new(),
            cancelled: false,
        }
    }

    /// Marks the report finished.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// True when no project failed to write its artifacts.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.projects
            .iter()
            .all(|p| p.status != ProjectStatus::Failed)
    }

    /// Reports for a given status.
    pub fn with_status(&self, status: ProjectStatus) -> impl Iterator<Item = &ProjectReport> {
        self.projects.iter().filter(move |p| p.status == status)
    }

    /// Looks up a project's report.
    #[must_use]
    pub fn project(&self, project_key: &str) -> Option<&ProjectReport> {
        self.projects.iter().find(|p| p.project_key == project_key)
    }

    /// Total rows exported across all projects.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.projects.iter().map(ProjectReport::kept).sum()
    }
}
