//! Batch indexer that brings the vector index and metadata store in line with the corpus.
//!
//! ## Key Components
//!
//! - **Indexer**: runs one indexing pass over a [`Corpus`]
//! - **IndexerConfig**: artifact locations, chunking, and [`IndexingMode`]
//! - **IndexingReport**: what a pass did, including skipped and failed documents
//!
//! ## Pipeline Flow
//!
//! ```text
//! Corpus::list ─→ Registry::diff ─→ for each changed document (sorted by id):
//!                                      Corpus::load → WordChunker → EmbeddingProvider
//!                                      → IndexArtifacts::append → Registry::record
//!              ─→ persist index, metadata, registry (only if something was appended)
//! ```
//!
//! ## Failure semantics
//!
//! Work is contained per document. A document that cannot be read, yields no
//! chunks, or fails to embed is reported and left out of the registry, so the next
//! pass retries it. Documents appended earlier in the same pass stay appended;
//! there is no rollback. Only failures that make the whole pass meaningless
//! (unreadable corpus listing, corrupt artifacts, embedder dimension mismatch)
//! abort it.
//!
//! A [`IndexingMode::FullRebuild`] pass starts from an empty registry and builds
//! the new index in memory. The artifacts on disk are only replaced once at least
//! one document has been appended, so a rebuild that fails (missing corpus,
//! embedder down) leaves the previous index in place.
//!
//! A pass over an unchanged corpus logs "no changes" and writes nothing, so
//! repeated passes leave all three artifacts byte-identical.
//!
//! The indexer is a single writer. Nothing here locks the data directory against
//! a concurrent pass.

use crate::corpus::{ChunkMode, Corpus};
use crate::error::{Result, RetrieverError};
use crate::registry::Registry;
use crate::storage::{ArtifactPaths, IndexArtifacts, MetadataRecord, VectorIndex};
use caselens_context::WordChunker;
use caselens_embed::EmbeddingProvider;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::indexing_mode::IndexingMode;

/// Configuration for the indexer
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Where the three artifacts are read from and written to
    pub paths: ArtifactPaths,
    /// Word chunking applied to [`ChunkMode::Words`] documents
    pub chunker: WordChunker,
    pub mode: IndexingMode,
}

impl IndexerConfig {
    /// Incremental indexing with the default 500-word chunks.
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            chunker: WordChunker::default(),
            mode: IndexingMode::Incremental,
        }
    }

    /// Set the chunker (builder style)
    pub fn with_chunker(mut self, chunker: WordChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Set the chunk size in words, keeping the noise threshold (builder style)
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunker = WordChunker::new(size, self.chunker.min_words());
        self
    }

    /// Set the indexing mode (builder style)
    pub fn with_mode(mut self, mode: IndexingMode) -> Self {
        self.mode = mode;
        self
    }
}

/// A document that was left out of this pass, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub id: String,
    pub reason: String,
}

/// Outcome of one indexing pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexingReport {
    pub mode: IndexingMode,
    /// Documents in the corpus listing
    pub documents_listed: usize,
    /// Documents new or changed since the last pass
    pub documents_changed: usize,
    /// Documents appended to the index in this pass
    pub documents_indexed: usize,
    /// Unreadable documents and documents without chunks
    pub skipped: Vec<SkippedDocument>,
    /// Documents whose embedding failed
    pub failed: Vec<SkippedDocument>,
    pub chunks_added: usize,
    /// Vectors in the index after this pass
    pub total_vectors: usize,
    /// Registered documents that are no longer in the corpus
    pub stale_documents: Vec<String>,
    /// Whether any artifact was written
    pub persisted: bool,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl IndexingReport {
    pub fn is_noop(&self) -> bool {
        self.documents_changed == 0
    }
}

impl std::fmt::Display for IndexingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_noop() {
            return write!(
                f,
                "No changes: {} documents up to date, {} vectors indexed",
                self.documents_listed, self.total_vectors
            );
        }
        writeln!(f, "Indexing pass ({})", self.mode)?;
        writeln!(f, "  Documents listed:   {}", self.documents_listed)?;
        writeln!(f, "  Documents changed:  {}", self.documents_changed)?;
        writeln!(f, "  Documents indexed:  {}", self.documents_indexed)?;
        writeln!(f, "  Chunks added:       {}", self.chunks_added)?;
        writeln!(f, "  Total vectors:      {}", self.total_vectors)?;
        for doc in &self.skipped {
            writeln!(f, "  Skipped {}: {}", doc.id, doc.reason)?;
        }
        for doc in &self.failed {
            writeln!(f, "  Failed {}: {}", doc.id, doc.reason)?;
        }
        if !self.stale_documents.is_empty() {
            writeln!(
                f,
                "  Stale registry entries: {} (run with --rebuild to drop them)",
                self.stale_documents.len()
            )?;
        }
        write!(f, "  Elapsed: {:.2?}", self.elapsed)
    }
}

/// Sole writer of the vector index, metadata store and registry
pub struct Indexer {
    config: IndexerConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    corpus: Arc<dyn Corpus>,
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("config", &self.config)
            .field("embedder", &self.embedder.provider_name())
            .field("corpus", &self.corpus.describe())
            .finish()
    }
}

impl Indexer {
    pub fn new(
        config: IndexerConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        corpus: Arc<dyn Corpus>,
    ) -> Self {
        Self {
            config,
            embedder,
            corpus,
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Run one indexing pass.
    pub async fn incremental_index(&self) -> Result<IndexingReport> {
        let started = Instant::now();
        let paths = &self.config.paths;
        let mut report = IndexingReport {
            mode: self.config.mode,
            ..IndexingReport::default()
        };

        info!(
            "Starting {} indexing pass over {}",
            self.config.mode,
            self.corpus.describe()
        );

        let listing = self.corpus.list().await?;
        let rebuild = self.config.mode.discards_existing();
        let mut registry = if rebuild {
            info!("Full rebuild requested, existing artifacts are replaced once the new index is built");
            Registry::default()
        } else {
            Registry::load(&paths.registry)?
        };
        let changed = registry.diff(&listing);

        report.documents_listed = listing.len();
        report.documents_changed = changed.len();

        if changed.is_empty() && !rebuild {
            report.total_vectors = IndexArtifacts::load(paths)?.map_or(0, |a| a.len());
            report.stale_documents = registry.stale(&listing);
            report.elapsed = started.elapsed();
            info!(
                "Index is up to date, no changes ({} documents)",
                listing.len()
            );
            return Ok(report);
        }

        info!(
            "{} of {} documents are new or changed",
            changed.len(),
            listing.len()
        );

        let expected = self.embedder.embedding_dimension();
        if expected == 0 {
            return Err(RetrieverError::configuration(format!(
                "embedder {} reports dimension 0",
                self.embedder.provider_name()
            )));
        }

        let mut artifacts = if rebuild {
            None
        } else {
            IndexArtifacts::load(paths)?
        };
        if let Some(existing) = &artifacts {
            if !existing.is_empty() && existing.index.dimension() != expected {
                return Err(RetrieverError::configuration(format!(
                    "index at {} has dimension {} but the embedder produces {}; rebuild the index",
                    paths.index.display(),
                    existing.index.dimension(),
                    expected
                )));
            }
        }

        let hashes: std::collections::HashMap<&str, &str> = listing
            .iter()
            .map(|e| (e.id.as_str(), e.content_hash.as_str()))
            .collect();

        for id in &changed {
            let document = match self.corpus.load(id).await {
                Ok(document) => document,
                Err(e) => {
                    warn!("Skipping {id}: {e}");
                    report.skipped.push(SkippedDocument {
                        id: id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let chunks = match document.chunking {
                ChunkMode::Words => self.config.chunker.chunk(id, &document.text),
                ChunkMode::Whole => self.config.chunker.whole(id, &document.text),
            };
            if chunks.is_empty() {
                warn!("Skipping {id}: no chunks above the minimum word count");
                report.skipped.push(SkippedDocument {
                    id: id.clone(),
                    reason: "no extractable chunks".to_string(),
                });
                continue;
            }

            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let embeddings = match self.embedder.embed_texts(&texts).await {
                Ok(result) if result.len() == texts.len() => result.embeddings,
                Ok(result) => {
                    error!(
                        "Embedding {id} returned {} vectors for {} chunks",
                        result.len(),
                        texts.len()
                    );
                    report.failed.push(SkippedDocument {
                        id: id.clone(),
                        reason: "embedding count mismatch".to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    error!("Embedding failed for {id}: {e}");
                    report.failed.push(SkippedDocument {
                        id: id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let records: Vec<MetadataRecord> = chunks
                .into_iter()
                .map(|chunk| MetadataRecord {
                    source: id.clone(),
                    chunk_index: chunk.sequence,
                    text: chunk.text,
                    case: document.case.clone(),
                })
                .collect();

            let target = artifacts.get_or_insert_with(|| {
                debug!("Creating vector index with dimension {expected}");
                IndexArtifacts::new(expected)
            });
            if let Err(e) = target.append(&embeddings, records) {
                error!("Cannot append {id}: {e}");
                report.failed.push(SkippedDocument {
                    id: id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }

            let hash = hashes.get(id.as_str()).copied().unwrap_or_default();
            registry.record(id.clone(), hash, Utc::now());
            report.documents_indexed += 1;
            report.chunks_added += embeddings.len();
            info!("Indexed {id}: {} chunks", embeddings.len());
        }

        report.stale_documents = registry.stale(&listing);
        if !report.stale_documents.is_empty() {
            info!(
                "{} registry entries refer to documents no longer in the corpus",
                report.stale_documents.len()
            );
        }

        match &artifacts {
            Some(artifacts) if report.documents_indexed > 0 => {
                artifacts.persist(paths)?;
                registry.save(&paths.registry)?;
                info!("Saved registry with {} entries", registry.len());
                report.persisted = true;
                report.total_vectors = artifacts.len();
            }
            _ if rebuild && listing.is_empty() => {
                info!("Corpus is empty, removing existing artifacts");
                paths.remove_all()?;
                report.persisted = true;
            }
            _ if rebuild => {
                report.total_vectors = IndexArtifacts::load(paths)
                    .ok()
                    .flatten()
                    .map_or(0, |a| a.len());
                warn!("Rebuild indexed no documents, existing artifacts left in place");
            }
            other => {
                report.total_vectors = other.as_ref().map_or(0, |a| a.len());
                warn!("No documents were indexed in this pass, nothing written");
            }
        }

        report.elapsed = started.elapsed();
        info!(
            "Indexing pass finished: {} indexed, {} skipped, {} failed, {} vectors total",
            report.documents_indexed,
            report.skipped.len(),
            report.failed.len(),
            report.total_vectors
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusEntry, ExtractedDocument};
    use crate::registry::content_hash;
    use async_trait::async_trait;
    use crate::corpus::DocumentCorpus;
    use caselens_embed::{EmbedError, EmbeddingResult, HashingEmbedder};
    use std::collections::BTreeMap;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    struct MemoryCorpus {
        docs: BTreeMap<String, String>,
    }

    impl MemoryCorpus {
        fn new(docs: &[(&str, String)]) -> Self {
            Self {
                docs: docs
                    .iter()
                    .map(|(id, text)| (id.to_string(), text.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl Corpus for MemoryCorpus {
        async fn list(&self) -> Result<Vec<CorpusEntry>> {
            Ok(self
                .docs
                .iter()
                .map(|(id, text)| CorpusEntry {
                    id: id.clone(),
                    content_hash: content_hash(text.as_bytes()),
                })
                .collect())
        }

        async fn load(&self, id: &str) -> Result<ExtractedDocument> {
            Ok(ExtractedDocument {
                id: id.to_string(),
                text: self.docs[id].clone(),
                case: None,
                chunking: ChunkMode::Words,
            })
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    fn words(prefix: &str, n: usize) -> String {
        (0..n).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>().join(" ")
    }

    #[tokio::test]
    #[traced_test]
    async fn test_incremental_pass_then_noop() -> Result<()> {
        let dir = tempdir()?;
        let paths = ArtifactPaths::in_dir(dir.path());
        let corpus = Arc::new(MemoryCorpus::new(&[
            ("a.txt", words("a", 60)),
            ("b.txt", words("b", 10)),
        ]));
        let indexer = Indexer::new(
            IndexerConfig::new(paths.clone()).with_chunk_size(25),
            Arc::new(HashingEmbedder::new(32)),
            corpus,
        );

        let first = indexer.incremental_index().await?;
        assert_eq!(first.documents_changed, 2);
        assert_eq!(first.documents_indexed, 1);
        // 60 words at 25 per chunk: 25, 25 and a 10-word remainder that is dropped
        assert_eq!(first.chunks_added, 2);
        assert_eq!(first.skipped.len(), 1);
        assert_eq!(first.skipped[0].id, "b.txt");
        assert!(first.persisted);
        assert!(logs_contain("Skipping b.txt"));

        let second = indexer.incremental_index().await?;
        // b.txt was never registered, so it is retried and skipped again
        assert_eq!(second.documents_changed, 1);
        assert!(!second.persisted);
        assert_eq!(second.total_vectors, 2);
        Ok(())
    }

    /// Reports `dimension` but fails every call
    struct BrokenEmbedder {
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        async fn embed_texts(&self, _texts: &[String]) -> caselens_embed::Result<EmbeddingResult> {
            Err(EmbedError::embedding_gen("backend unavailable"))
        }

        fn embedding_dimension(&self) -> usize {
            self.dimension
        }

        fn provider_name(&self) -> &str {
            "broken"
        }
    }

    async fn build_index(paths: &ArtifactPaths) -> Result<Vec<Vec<u8>>> {
        let corpus = Arc::new(MemoryCorpus::new(&[("a.txt", words("a", 30))]));
        Indexer::new(
            IndexerConfig::new(paths.clone()),
            Arc::new(HashingEmbedder::new(32)),
            corpus,
        )
        .incremental_index()
        .await?;
        snapshot(paths)
    }

    fn snapshot(paths: &ArtifactPaths) -> Result<Vec<Vec<u8>>> {
        Ok(vec![
            std::fs::read(&paths.index)?,
            std::fs::read(&paths.metadata)?,
            std::fs::read(&paths.registry)?,
        ])
    }

    #[tokio::test]
    async fn test_rebuild_over_missing_corpus_keeps_index() -> Result<()> {
        let dir = tempdir()?;
        let paths = ArtifactPaths::in_dir(dir.path().join("data"));
        let before = build_index(&paths).await?;

        let indexer = Indexer::new(
            IndexerConfig::new(paths.clone()).with_mode(IndexingMode::FullRebuild),
            Arc::new(HashingEmbedder::new(32)),
            Arc::new(DocumentCorpus::new(dir.path().join("no-such-docs"))),
        );
        let err = indexer.incremental_index().await.unwrap_err();
        assert!(matches!(err, RetrieverError::Configuration { .. }));

        assert_eq!(snapshot(&paths)?, before);
        assert_eq!(IndexArtifacts::load(&paths)?.map(|a| a.len()), Some(1));
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_rebuild_with_backend_down_keeps_index() -> Result<()> {
        let dir = tempdir()?;
        let paths = ArtifactPaths::in_dir(dir.path());
        let before = build_index(&paths).await?;

        let corpus = Arc::new(MemoryCorpus::new(&[("a.txt", words("a", 30))]));
        let report = Indexer::new(
            IndexerConfig::new(paths.clone()).with_mode(IndexingMode::FullRebuild),
            Arc::new(BrokenEmbedder { dimension: 32 }),
            corpus,
        )
        .incremental_index()
        .await?;

        assert_eq!(report.failed.len(), 1);
        assert!(!report.persisted);
        assert_eq!(report.total_vectors, 1);
        assert!(logs_contain("existing artifacts left in place"));
        assert_eq!(snapshot(&paths)?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_rebuild_of_empty_corpus_clears_artifacts() -> Result<()> {
        let dir = tempdir()?;
        let paths = ArtifactPaths::in_dir(dir.path());
        build_index(&paths).await?;

        let report = Indexer::new(
            IndexerConfig::new(paths.clone()).with_mode(IndexingMode::FullRebuild),
            Arc::new(HashingEmbedder::new(32)),
            Arc::new(MemoryCorpus::new(&[])),
        )
        .incremental_index()
        .await?;

        assert!(report.persisted);
        assert!(IndexArtifacts::load(&paths)?.is_none());
        assert!(!paths.registry.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_dimension_embedder_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let paths = ArtifactPaths::in_dir(dir.path());
        let corpus = Arc::new(MemoryCorpus::new(&[("a.txt", words("a", 30))]));
        let indexer = Indexer::new(
            IndexerConfig::new(paths.clone()),
            Arc::new(BrokenEmbedder { dimension: 0 }),
            corpus,
        );

        let err = indexer.incremental_index().await.unwrap_err();
        assert!(matches!(err, RetrieverError::Configuration { .. }));
        assert!(err.to_string().contains("dimension 0"));
        assert!(!paths.index.exists());
        assert!(!paths.metadata.exists());
        Ok(())
    }

    #[test]
    fn test_config_builders() {
        let config = IndexerConfig::new(ArtifactPaths::in_dir("/tmp/x"))
            .with_chunk_size(100)
            .with_mode(IndexingMode::FullRebuild);
        assert_eq!(config.chunker.chunk_size(), 100);
        assert_eq!(config.chunker.min_words(), 20);
        assert_eq!(config.mode, IndexingMode::FullRebuild);
    }

    #[test]
    fn test_report_display() {
        let report = IndexingReport {
            documents_listed: 3,
            total_vectors: 12,
            ..IndexingReport::default()
        };
        assert_eq!(
            report.to_string(),
            "No changes: 3 documents up to date, 12 vectors indexed"
        );
    }
}
