//! CSV artifacts: `<KEY>-frame.csv` and `<KEY>-pivot.csv`.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{OutputSink, ProjectArtifacts};
use crate::errors::Result;
use crate::models::{DependencyLinkRecord, DependencySummary};

/// Header of the frame table. The leading empty column is the row index.
pub const FRAME_COLUMNS: [&str; 11] = [
    "",
    "project",
    "repo",
    "filepath",
    "filename",
    "last commit",
    "service",
    "links",
    "netloc",
    "path",
    "keywords",
];

/// Header of the pivot table.
pub const PIVOT_COLUMNS: [&str; 3] = ["repo", "service", "links"];

/// Writes the frame table to `writer`.
pub fn write_frame<W: Write>(writer: W, table: &[DependencyLinkRecord]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(FRAME_COLUMNS)?;
    for (index, row) in table.iter().enumerate() {
        let index = index.to_string();
        let keywords = row.keywords_display();
        out.write_record([
            index.as_str(),
            row.project.as_str(),
            row.repo.as_str(),
            row.filepath.as_str(),
            row.filename.as_str(),
            row.last_commit_time.as_str(),
            row.service.as_str(),
            row.link.as_str(),
            row.netloc.as_str(),
            row.path.as_str(),
            keywords.as_str(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the pivot table to `writer`.
pub fn write_pivot<W: Write>(writer: W, summary: &DependencySummary) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(PIVOT_COLUMNS)?;
    for entry in &summary.entries {
        let count = entry.count.to_string();
        out.write_record([entry.repo.as_str(), entry.service.as_str(), count.as_str()])?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the two CSV artifacts into a directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    /// Creates a sink writing into `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for CsvSink {
    fn write_project(
        &self,
        project_key: &str,
        table: &[DependencyLinkRecord],
        summary: &DependencySummary,
    ) -> Result<ProjectArtifacts> {
        std::fs::create_dir_all(&self.dir)?;
        let artifacts = ProjectArtifacts::in_dir(&self.dir, project_key);

        write_frame(std::fs::File::create(&artifacts.frame)?, table)?;
        write_pivot(std::fs::File::create(&artifacts.pivot)?, summary)?;

        info!(
            project = %project_key,
            frame = %artifacts.frame.display(),
            pivot = %artifacts.pivot.display(),
            "Saved artifacts"
        );
        Ok(artifacts)
    }
}
