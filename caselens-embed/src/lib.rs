//! # caselens-embed
//!
//! Text embedding providers for the caselens retrieval core. Every provider turns a
//! batch of strings into fixed-dimension `f32` vectors and is deterministic for a
//! fixed model version.
//!
//! ## Providers
//!
//! - [`FastEmbedProvider`]: local ONNX sentence-transformer models through FastEmbed
//!   (`all-MiniLM-L6-v2` by default, 384 dimensions)
//! - [`HashingEmbedder`]: feature-hashed bag of words, no model download, useful for
//!   offline runs and tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use caselens_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> caselens_embed::Result<()> {
//! let provider = FastEmbedProvider::create(EmbedConfig::default()).await?;
//!
//! let texts = vec!["printer offline after update".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//! assert_eq!(result.dimension, 384);
//! # Ok(())
//! # }
//! ```
//!
//! ## Empty input
//!
//! An empty string is embedded like any other input. The model still returns a
//! vector of the configured dimension, it just carries no signal (the hashing
//! provider returns the zero vector). Callers that want to skip blank text must do
//! so themselves; the providers never filter it silently.
//!
//! ## Ownership
//!
//! Providers hold their model explicitly. There is no process-wide model cache:
//! construct one provider in the calling layer and share it behind an `Arc`.

pub mod config;
pub mod error;
pub mod hashing;
pub mod provider;

pub use config::{EmbedConfig, ProviderKind};
pub use error::{EmbedError, Result};
pub use hashing::HashingEmbedder;
pub use provider::{
    EmbeddingProvider, EmbeddingResult, FastEmbedProvider, Vector, create_provider, normalize,
};
