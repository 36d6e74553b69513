//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use fastembed::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dimension of the reference corpus model (`all-MiniLM-L6-v2`).
pub const DEFAULT_DIMENSION: usize = 384;

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local ONNX model through FastEmbed
    #[default]
    #[serde(alias = "fast-embed")]
    FastEmbed,
    /// Deterministic feature hashing, no model files
    Hashing,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::FastEmbed => write!(f, "fastembed"),
            ProviderKind::Hashing => write!(f, "hashing"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fastembed" | "fast-embed" | "onnx" => Ok(ProviderKind::FastEmbed),
            "hashing" | "hash" => Ok(ProviderKind::Hashing),
            _ => Err(format!(
                "Invalid embedding provider: '{s}'. Valid values are: fastembed, hashing"
            )),
        }
    }
}

/// Configuration for embedding models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Backend used to produce vectors
    pub provider: ProviderKind,
    /// Name of the embedding model to use
    #[serde(rename = "model")]
    pub model_name: String,
    /// Directory where FastEmbed keeps downloaded model files
    pub cache_dir: PathBuf,
    /// Maximum batch size for a single backend call
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings
    pub normalize: bool,
    /// Output dimension for the hashing provider (FastEmbed reports its own)
    pub dimension: usize,
    /// Show a progress bar while FastEmbed downloads a model
    pub show_download_progress: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::FastEmbed,
            model_name: "all-MiniLM-L6-v2".to_string(),
            cache_dir: PathBuf::from(".fastembed_cache"),
            batch_size: 32,
            normalize: true,
            dimension: DEFAULT_DIMENSION,
            show_download_progress: false,
        }
    }
}

impl EmbedConfig {
    /// Create a FastEmbed configuration for a named model
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Configuration for the offline hashing provider
    pub fn hashing(dimension: usize) -> Self {
        Self {
            provider: ProviderKind::Hashing,
            model_name: "feature-hashing".to_string(),
            dimension,
            ..Self::default()
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Set the model cache directory (builder style)
    pub fn with_cache_dir<P: AsRef<Path>>(self, cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            ..self
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Resolve the configured name to a FastEmbed built-in model.
    ///
    /// Accepts the bare sentence-transformers name as well as the
    /// `organisation/name` form.
    pub fn fastembed_model(&self) -> Result<EmbeddingModel> {
        let name = self
            .model_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.model_name)
            .to_lowercase();

        match name.as_str() {
            "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
            "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
            "snowflake-arctic-embed-xs" => Ok(EmbeddingModel::SnowflakeArcticEmbedXS),
            _ => Err(EmbedError::invalid_config(format!(
                "Unsupported FastEmbed model '{}'",
                self.model_name
            ))),
        }
    }

    /// Validate settings that do not require loading a model
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be positive"));
        }
        match self.provider {
            ProviderKind::FastEmbed => {
                self.fastembed_model()?;
            }
            ProviderKind::Hashing => {
                if self.dimension == 0 {
                    return Err(EmbedError::invalid_config(
                        "hashing provider needs a positive dimension",
                    ));
                }
            }
        }
        tracing::debug!("Embedding configuration valid for: {}", self.model_name);
        Ok(())
    }
}
