//! Repo x service aggregation of the filtered dependency table.

use std::collections::BTreeMap;

use crate::models::{DependencyLinkRecord, DependencySummary, DependencySummaryEntry};

/// Counts rows per exact `(repo, service)` key.
///
/// Keys without rows are absent. Entries come out ordered by key, so the
/// summary is deterministic for a given table.
#[must_use]
pub fn summarize(rows: &[DependencyLinkRecord]) -> DependencySummary {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for row in rows {
        *counts
            .entry((row.repo.as_str(), row.service.as_str()))
            .or_default() += 1;
    }

    DependencySummary {
        entries: counts
            .into_iter()
            .map(|((repo, service), count)| DependencySummaryEntry {
                repo: repo.to_string(),
                service: service.to_string(),
                count,
            })
            .collect(),
    }
}
