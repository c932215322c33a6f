//! Output sinks for the per-project artifacts.

mod csv_sink;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::models::{DependencyLinkRecord, DependencySummary};

pub use csv_sink::{write_frame, write_pivot, CsvSink, FRAME_COLUMNS, PIVOT_COLUMNS};

/// Locations of the two artifacts written for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectArtifacts {
    /// The flat record-per-link table.
    pub frame: PathBuf,
    /// The repo x service pivot table.
    pub pivot: PathBuf,
}

impl ProjectArtifacts {
    /// Artifact paths for a project key inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path, project_key: &str) -> Self {
        Self {
            frame: dir.join(format!("{project_key}-frame.csv")),
            pivot: dir.join(format!("{project_key}-pivot.csv")),
        }
    }
}

/// Destination for a project's filtered table and summary.
pub trait OutputSink: Send + Sync {
    /// Writes both artifacts for a project.
    fn write_project(
        &self,
        project_key: &str,
        table: &[DependencyLinkRecord],
        summary: &DependencySummary,
    ) -> Result<ProjectArtifacts>;
}

/// A project's output as captured by [`CollectingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedProject {
    /// Project key.
    pub project_key: String,
    /// Filtered dependency table.
    pub table: Vec<DependencyLinkRecord>,
    /// Summary matrix.
    pub summary: DependencySummary,
}

/// A sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    projects: Mutex<Vec<CollectedProject>>,
    failing: HashSet<String>,
}

impl CollectingSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes writes for a project key fail with an IO error.
    #[must_use]
    pub fn with_failure(mut self, project_key: impl Into<String>) -> Self {
        self.failing.insert(project_key.into());
        self
    }

    /// Everything written so far, in write order.
    #[must_use]
    pub fn projects(&self) -> Vec<CollectedProject> {
        self.projects.lock().clone()
    }

    /// The output for one project key, if written.
    #[must_use]
    pub fn project(&self, project_key: &str) -> Option<CollectedProject> {
        self.projects
            .lock()
            .iter()
            .find(|p| p.project_key == project_key)
            .cloned()
    }
}

impl OutputSink for CollectingSink {
    fn write_project(
        &self,
        project_key: &str,
        table: &[DependencyLinkRecord],
        summary: &DependencySummary,
    ) -> Result<ProjectArtifacts> {
        if self.failing.contains(project_key) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("refusing to write {project_key}"),
            )
            .into());
        }
        self.projects.lock().push(CollectedProject {
            project_key: project_key.to_string(),
            table: table.to_vec(),
            summary: summary.clone(),
        });
        Ok(ProjectArtifacts::in_dir(Path::new(""), project_key))
    }
}
