//! Query-time retrieval over a loaded index.
//!
//! A [`Retriever`] owns shared, read-only handles to an embedder, a vector index
//! and the metadata store aligned with it. It is cheap to clone and safe to call
//! from any number of tasks at once. It never reloads by itself; build a new one
//! after an indexing pass to see the new artifacts.
//!
//! ```no_run
//! use caselens_embed::{EmbedConfig, create_provider};
//! use caselens_retriever::retrieval::retriever::Retriever;
//! use caselens_retriever::storage::ArtifactPaths;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let embedder = create_provider(&EmbedConfig::default()).await?;
//! let retriever = Retriever::open(&ArtifactPaths::in_dir("data"), embedder)?;
//!
//! for hit in retriever.search("vpn keeps disconnecting", 5).await? {
//!     println!("{:>5.1}%  {}", hit.confidence, hit.record.source);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, RetrieverError};
use crate::storage::{ArtifactPaths, IndexArtifacts, MetadataRecord, MetadataStore, VectorIndex};
use caselens_context::Passage;
use caselens_embed::EmbeddingProvider;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::scoring::min_max_confidence;

/// One search hit. Built per query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    /// Slot in the vector index
    pub position: usize,
    /// Raw squared-L2 distance, lower is more similar
    pub distance: f32,
    /// Per-query confidence in `[0, 100]`; see [`super::scoring`]
    pub confidence: f32,
    pub record: MetadataRecord,
}

impl ScoredResult {
    pub fn to_passage(&self) -> Passage {
        Passage::new(
            self.record.source.clone(),
            self.record.text.clone(),
            self.confidence,
        )
    }
}

/// Render search results as the prompt context block, in result order.
pub fn format_context(results: &[ScoredResult]) -> String {
    let passages: Vec<Passage> = results.iter().map(ScoredResult::to_passage).collect();
    caselens_context::format_context(&passages)
}

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    metadata: Arc<MetadataStore>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.provider_name())
            .field("vectors", &self.index.len())
            .field("records", &self.metadata.len())
            .finish()
    }
}

impl Retriever {
    /// Assemble a retriever from already-loaded parts.
    ///
    /// No consistency check is made here; out-of-range hits are dropped per query.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        metadata: Arc<MetadataStore>,
    ) -> Self {
        Self {
            embedder,
            index,
            metadata,
        }
    }

    /// Load the index and metadata store from disk.
    ///
    /// Missing artifacts are a [`RetrieverError::Configuration`] error: the index
    /// has to be built first. A half-present or misaligned pair is a
    /// [`RetrieverError::IndexInconsistency`].
    pub fn open(paths: &ArtifactPaths, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let artifacts = IndexArtifacts::load(paths)?.ok_or_else(|| {
            RetrieverError::configuration(format!(
                "no index found at {} and {}; run an indexing pass first",
                paths.index.display(),
                paths.metadata.display()
            ))
        })?;

        let expected = embedder.embedding_dimension();
        if !artifacts.is_empty() && artifacts.index.dimension() != expected {
            return Err(RetrieverError::configuration(format!(
                "index has dimension {} but the embedder produces {}",
                artifacts.index.dimension(),
                expected
            )));
        }

        Ok(Self::new(
            embedder,
            Arc::new(artifacts.index),
            Arc::new(artifacts.metadata),
        ))
    }

    /// Number of vectors available for search.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Up to `top_k` results, most similar first.
    ///
    /// A blank query or `top_k == 0` returns nothing without embedding or touching
    /// the index. Asking for more results than the index holds returns all of them.
    /// An embedding failure is returned as [`RetrieverError::EmbeddingBackend`].
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredResult>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let k = top_k.min(self.index.len());
        if k == 0 {
            debug!("Search against an empty index");
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_text(query).await?;
        let mut neighbors = self.index.search(&query_vector, k)?;

        let bound = self.metadata.len();
        neighbors.retain(|n| {
            let in_bounds = n.position < bound;
            if !in_bounds {
                warn!(
                    "Dropping candidate at position {} outside metadata store of {} records",
                    n.position, bound
                );
            }
            in_bounds
        });
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let distances: Vec<f32> = neighbors.iter().map(|n| n.distance).collect();
        let confidences = min_max_confidence(&distances);

        let results = neighbors
            .into_iter()
            .zip(confidences)
            .filter_map(|(n, confidence)| {
                self.metadata.get(n.position).map(|record| ScoredResult {
                    position: n.position,
                    distance: n.distance,
                    confidence,
                    record: record.clone(),
                })
            })
            .collect::<Vec<_>>();

        debug!("Query returned {} results (k = {})", results.len(), k);
        Ok(results)
    }

    /// Search and reduce the hits to prompt passages.
    pub async fn retrieve_context(&self, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        let results = self.search(query, top_k).await?;
        Ok(results.iter().map(ScoredResult::to_passage).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FlatL2Index, Neighbor};
    use caselens_embed::{EmbeddingResult, HashingEmbedder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns fixed neighbors, including positions past the metadata store.
    #[derive(Debug)]
    struct ScriptedIndex {
        neighbors: Vec<Neighbor>,
        size: usize,
        searches: AtomicUsize,
    }

    impl VectorIndex for ScriptedIndex {
        fn dimension(&self) -> usize {
            4
        }
        fn len(&self) -> usize {
            self.size
        }
        fn add(&mut self, _vectors: &[Vec<f32>]) -> Result<()> {
            Ok(())
        }
        fn search(&self, _query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(self.neighbors.iter().take(k).copied().collect())
        }
    }

    struct ZeroEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ZeroEmbedder {
        async fn embed_texts(&self, texts: &[String]) -> caselens_embed::Result<EmbeddingResult> {
            Ok(EmbeddingResult::new(vec![vec![0.0; 4]; texts.len()]))
        }
        fn embedding_dimension(&self) -> usize {
            4
        }
        fn provider_name(&self) -> &str {
            "zero"
        }
    }

    fn store(n: usize) -> Arc<MetadataStore> {
        Arc::new(MetadataStore::from_records(
            (0..n)
                .map(|i| MetadataRecord::new(format!("doc{i}"), 0, format!("text {i}")))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_out_of_bounds_candidates_are_dropped() -> Result<()> {
        let index = Arc::new(ScriptedIndex {
            neighbors: vec![
                Neighbor { position: 5, distance: 0.1 },
                Neighbor { position: 1, distance: 0.2 },
                Neighbor { position: 0, distance: 0.6 },
            ],
            size: 6,
            searches: AtomicUsize::new(0),
        });
        let retriever = Retriever::new(Arc::new(ZeroEmbedder), index, store(2));

        let results = retriever.search("anything", 3).await?;
        let positions: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 0]);
        // Confidence is scaled over the surviving results only
        assert_eq!(results[0].confidence, 100.0);
        assert_eq!(results[1].confidence, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_all_candidates_out_of_bounds() -> Result<()> {
        let index = Arc::new(ScriptedIndex {
            neighbors: vec![Neighbor { position: 9, distance: 0.0 }],
            size: 10,
            searches: AtomicUsize::new(0),
        });
        let retriever = Retriever::new(Arc::new(ZeroEmbedder), index, store(1));
        assert!(retriever.search("anything", 5).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_query_and_zero_k_skip_the_index() -> Result<()> {
        let index = Arc::new(ScriptedIndex {
            neighbors: vec![Neighbor { position: 0, distance: 0.0 }],
            size: 1,
            searches: AtomicUsize::new(0),
        });
        let retriever = Retriever::new(Arc::new(ZeroEmbedder), index.clone(), store(1));

        assert!(retriever.search("", 5).await?.is_empty());
        assert!(retriever.search(" \t\n", 5).await?.is_empty());
        assert!(retriever.search("real query", 0).await?.is_empty());
        assert_eq!(index.searches.load(Ordering::SeqCst), 0);

        assert_eq!(retriever.search("real query", 5).await?.len(), 1);
        assert_eq!(index.searches.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_context_follows_result_order() -> Result<()> {
        let embedder = HashingEmbedder::new(64);
        let texts = ["printer jams on tray two", "vpn tunnel drops hourly", "password reset loop"];
        let mut index = FlatL2Index::new(64);
        index.add(&texts.iter().map(|t| embedder.embed_one(t)).collect::<Vec<_>>())?;
        let metadata = MetadataStore::from_records(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| MetadataRecord::new(format!("kb{i}.md"), 0, *t))
                .collect(),
        );
        let retriever = Retriever::new(Arc::new(embedder), Arc::new(index), Arc::new(metadata));

        let results = retriever.search("vpn tunnel drops", 3).await?;
        assert_eq!(results[0].record.source, "kb1.md");

        let block = format_context(&results);
        assert!(block.starts_with("[1] source: kb1.md | confidence: 100.0%\nvpn tunnel drops hourly"));

        let passages = retriever.retrieve_context("vpn tunnel drops", 2).await?;
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].source, "kb1.md");
        Ok(())
    }
}
