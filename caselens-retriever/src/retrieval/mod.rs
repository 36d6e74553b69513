//! Indexing and query-time retrieval.
//!
//! - [`indexing_engine`]: the batch [`Indexer`](indexing_engine::Indexer)
//! - [`indexing_mode`]: incremental versus full-rebuild passes
//! - [`retriever`]: k-NN search joined with metadata
//! - [`scoring`]: per-query min-max confidence

pub mod indexing_engine;
pub mod indexing_mode;
pub mod retriever;
pub mod scoring;
