//! Index health inspection.
//!
//! [`IndexStatus::inspect`] reads the three artifacts independently and reports
//! what it finds instead of failing on the first problem, so an operator can see
//! *why* an index must be rebuilt.

use crate::corpus::CorpusEntry;
use crate::registry::Registry;
use crate::storage::{ArtifactPaths, FlatL2Index, MetadataStore, VectorIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Index and metadata store present and aligned
    Healthy,
    /// Artifacts exist but cannot serve queries safely
    MustRebuild,
    /// No index has been built yet
    Missing,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Healthy => write!(f, "healthy"),
            Verdict::MustRebuild => write!(f, "must rebuild"),
            Verdict::Missing => write!(f, "missing"),
        }
    }
}

/// Snapshot of the persisted artifacts
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub paths: ArtifactPaths,
    pub index_present: bool,
    pub metadata_present: bool,
    pub registry_present: bool,
    /// Vectors in the index, when it could be read
    pub vector_count: Option<usize>,
    /// Records in the metadata store, when it could be read
    pub metadata_count: Option<usize>,
    pub dimension: Option<usize>,
    /// Distinct sources with at least one record
    pub source_count: Option<usize>,
    pub registry_entries: usize,
    /// Registered documents missing from the corpus (needs a corpus listing)
    pub stale_documents: Vec<String>,
    /// Documents new or changed since the last pass (needs a corpus listing)
    pub pending_documents: Option<usize>,
    pub problems: Vec<String>,
    pub verdict: Verdict,
}

impl IndexStatus {
    /// Inspect the artifacts at `paths`, comparing the registry against `listing`
    /// when one is given.
    pub fn inspect(paths: &ArtifactPaths, listing: Option<&[CorpusEntry]>) -> Self {
        let mut problems = Vec::new();

        let index_present = paths.index.exists();
        let metadata_present = paths.metadata.exists();
        let registry_present = paths.registry.exists();

        let index = index_present
            .then(|| FlatL2Index::load(&paths.index))
            .and_then(|r| r.map_err(|e| problems.push(e.to_string())).ok());
        let metadata = metadata_present
            .then(|| MetadataStore::load(&paths.metadata))
            .and_then(|r| {
                r.map_err(|e| problems.push(format!("metadata store unreadable: {e}")))
                    .ok()
            });
        let registry = Registry::load(&paths.registry).unwrap_or_else(|e| {
            problems.push(format!("registry unreadable: {e}"));
            Registry::default()
        });

        match (index_present, metadata_present) {
            (true, false) => problems.push("vector index exists without metadata store".to_string()),
            (false, true) => problems.push("metadata store exists without vector index".to_string()),
            _ => {}
        }
        if let (Some(index), Some(metadata)) = (&index, &metadata) {
            if index.len() != metadata.len() {
                problems.push(format!(
                    "vector index holds {} vectors but metadata store holds {} records",
                    index.len(),
                    metadata.len()
                ));
            }
        }

        let verdict = if !index_present && !metadata_present {
            Verdict::Missing
        } else if problems.is_empty() {
            Verdict::Healthy
        } else {
            Verdict::MustRebuild
        };

        Self {
            paths: paths.clone(),
            index_present,
            metadata_present,
            registry_present,
            vector_count: index.as_ref().map(|i| i.len()),
            metadata_count: metadata.as_ref().map(|m| m.len()),
            dimension: index.as_ref().map(|i| i.dimension()),
            source_count: metadata.as_ref().map(|m| {
                m.iter()
                    .map(|r| r.source.as_str())
                    .collect::<HashSet<_>>()
                    .len()
            }),
            registry_entries: registry.len(),
            stale_documents: listing.map(|l| registry.stale(l)).unwrap_or_default(),
            pending_documents: listing.map(|l| registry.diff(l).len()),
            problems,
            verdict,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.verdict == Verdict::Healthy
    }
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = |n: Option<usize>| n.map_or("-".to_string(), |n| n.to_string());
        writeln!(f, "Index status: {}", self.verdict)?;
        writeln!(f, "  Vector index:   {} ({})", self.paths.index.display(), count(self.vector_count))?;
        writeln!(f, "  Metadata store: {} ({})", self.paths.metadata.display(), count(self.metadata_count))?;
        writeln!(f, "  Registry:       {} ({} entries)", self.paths.registry.display(), self.registry_entries)?;
        writeln!(f, "  Dimension:      {}", count(self.dimension))?;
        writeln!(f, "  Sources:        {}", count(self.source_count))?;
        if let Some(pending) = self.pending_documents {
            writeln!(f, "  Pending documents: {pending}")?;
        }
        if !self.stale_documents.is_empty() {
            writeln!(f, "  Stale documents:   {}", self.stale_documents.join(", "))?;
        }
        for problem in &self.problems {
            writeln!(f, "  Problem: {problem}")?;
        }
        Ok(())
    }
}
