//! Persisted retrieval artifacts.
//!
//! The retrieval core keeps three files under the data directory. Two of them are
//! positionally aligned and only meaningful together:
//!
//! - **Vector index** ([`FlatL2Index`]): one vector per slot, append-only
//! - **Metadata store** ([`MetadataStore`]): one record per slot, same order
//! - **Registry** (`crate::registry`): which documents were embedded, by content hash
//!
//! ## Key Components
//!
//! - **VectorIndex**: k-NN seam used by the retriever (fakes in tests implement it)
//! - **IndexArtifacts**: loads and persists the index and metadata store as a pair
//! - **ArtifactPaths**: where the three files live
//!
//! ## Crash consistency
//!
//! Each file is replaced atomically, but the three are not written as a group.
//! [`IndexArtifacts::persist`] writes the index before the metadata store, and the
//! indexer writes the registry last. [`IndexArtifacts::load`] refuses a pair whose
//! lengths differ, so a crash between the first two writes surfaces as
//! [`RetrieverError::IndexInconsistency`] ("must rebuild") rather than as silently
//! misattributed results. A crash before the registry write only causes documents
//! to be embedded again on the next run.

use crate::error::{Result, RetrieverError};
use caselens_embed::Vector;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod atomic;
pub mod flat_index;
pub mod metadata;

pub use flat_index::FlatL2Index;
pub use metadata::{MetadataRecord, MetadataStore};

/// One k-NN hit: an index slot and its raw distance (lower is closer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Nearest-neighbor structure over fixed-dimension vectors.
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors to the end of the index.
    fn add(&mut self, vectors: &[Vector]) -> Result<()>;

    /// Up to `k` nearest neighbors of `query`, closest first.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

/// Locations of the persisted artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
    pub registry: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            index: dir.join("vector_index.bin"),
            metadata: dir.join("metadata.json"),
            registry: dir.join("index_registry.json"),
        }
    }

    /// Delete all three files. Missing files are ignored.
    pub fn remove_all(&self) -> Result<()> {
        for path in [&self.index, &self.metadata, &self.registry] {
            if atomic::remove_if_exists(path)? {
                info!("Removed {}", path.display());
            }
        }
        Ok(())
    }
}

/// The vector index and metadata store, loaded or written as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexArtifacts {
    pub index: FlatL2Index,
    pub metadata: MetadataStore,
}

impl IndexArtifacts {
    pub fn new(dimension: usize) -> Self {
        Self {
            index: FlatL2Index::new(dimension),
            metadata: MetadataStore::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Append vectors and their records, keeping the two aligned.
    ///
    /// Nothing is appended when the counts differ or a vector has the wrong
    /// dimension.
    pub fn append(&mut self, vectors: &[Vector], records: Vec<MetadataRecord>) -> Result<()> {
        if vectors.len() != records.len() {
            return Err(RetrieverError::inconsistency(format!(
                "{} vectors for {} metadata records",
                vectors.len(),
                records.len()
            )));
        }
        self.index.add(vectors)?;
        self.metadata.extend(records);
        Ok(())
    }

    /// Load the pair from disk.
    ///
    /// Returns `Ok(None)` when neither file exists. Exactly one file present, or
    /// two files of different lengths, is an [`RetrieverError::IndexInconsistency`].
    pub fn load(paths: &ArtifactPaths) -> Result<Option<Self>> {
        match (paths.index.exists(), paths.metadata.exists()) {
            (false, false) => Ok(None),
            (true, false) => Err(RetrieverError::inconsistency(format!(
                "vector index {} exists without metadata store {}; must rebuild",
                paths.index.display(),
                paths.metadata.display()
            ))),
            (false, true) => Err(RetrieverError::inconsistency(format!(
                "metadata store {} exists without vector index {}; must rebuild",
                paths.metadata.display(),
                paths.index.display()
            ))),
            (true, true) => {
                let index = FlatL2Index::load(&paths.index)?;
                let metadata = MetadataStore::load(&paths.metadata)?;
                if index.len() != metadata.len() {
                    return Err(RetrieverError::inconsistency(format!(
                        "vector index holds {} vectors but metadata store holds {} records; must rebuild",
                        index.len(),
                        metadata.len()
                    )));
                }
                debug!("Loaded {} aligned index entries", index.len());
                Ok(Some(Self { index, metadata }))
            }
        }
    }

    /// Write the vector index, then the metadata store.
    pub fn persist(&self, paths: &ArtifactPaths) -> Result<()> {
        self.index.save(&paths.index)?;
        self.metadata.save(&paths.metadata)?;
        info!(
            "Persisted {} vectors to {} and metadata to {}",
            self.index.len(),
            paths.index.display(),
            paths.metadata.display()
        );
        Ok(())
    }
}
