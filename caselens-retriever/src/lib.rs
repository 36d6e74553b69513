//! caselens-retriever: semantic retrieval over support cases and reference documents
//!
//! This crate turns a corpus of PDFs, text files or case exports into a persisted
//! vector index, keeps that index in step with the corpus as documents change, and
//! answers free-text queries with ranked, confidence-scored matches.
//!
//! ## Key Modules
//!
//! - **[`retrieval`]**: the batch indexer, the query-time retriever and confidence scoring
//! - **[`storage`]**: vector index, metadata store and their on-disk formats
//! - **[`registry`]**: content-hash change tracking for incremental indexing
//! - **[`corpus`]**: document directories and case exports as indexable sources
//! - **[`cases`]** / **[`insights`]**: case schema mapping and workload summaries
//! - **[`generation`]**: grounded answers through an external text generator
//! - **[`status`]**: artifact health and rebuild detection
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use caselens_embed::{EmbedConfig, create_provider};
//! use caselens_retriever::corpus::DocumentCorpus;
//! use caselens_retriever::retrieval::{
//!     indexing_engine::{Indexer, IndexerConfig},
//!     retriever::Retriever,
//! };
//! use caselens_retriever::storage::ArtifactPaths;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let paths = ArtifactPaths::in_dir("data");
//! let embedder = create_provider(&EmbedConfig::default()).await?;
//!
//! let indexer = Indexer::new(
//!     IndexerConfig::new(paths.clone()),
//!     embedder.clone(),
//!     Arc::new(DocumentCorpus::new("data/docs")),
//! );
//! println!("{}", indexer.incremental_index().await?);
//!
//! let retriever = Retriever::open(&paths, embedder)?;
//! let hits = retriever.search("printer offline after update", 5).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Corpus ─→ Registry::diff ─→ Indexer ─→ WordChunker ─→ EmbeddingProvider
//!                                 ↓
//!              vector_index.bin + metadata.json + index_registry.json
//!                                 ↓
//! query ─→ Retriever ─→ k-NN ─→ metadata join ─→ min-max confidence ─→ results
//!                                                       ↓
//!                                    format_context ─→ GenerationAdapter
//! ```
//!
//! There is no process-wide state. Callers construct the embedder, indexer and
//! retriever they need and pass them around explicitly.

pub mod cases;
pub mod config;
pub mod corpus;
pub mod error;
pub mod generation;
pub mod insights;
pub mod registry;
pub mod retrieval;
pub mod status;
pub mod storage;

pub use error::{Result, RetrieverError};
