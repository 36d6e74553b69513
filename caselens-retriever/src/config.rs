//! Runtime configuration.
//!
//! One TOML file with a section per concern. Every field has a default, so a
//! missing file or an empty one is a valid configuration:
//!
//! ```toml
//! [paths]
//! data_dir = "data"
//! corpus_dir = "data/docs"
//!
//! [corpus]
//! kind = "documents"
//!
//! [chunking]
//! chunk_size = 500
//! min_words = 20
//!
//! [embedding]
//! provider = "fastembed"
//! model = "all-MiniLM-L6-v2"
//!
//! [retrieval]
//! top_k = 5
//!
//! [generation]
//! endpoint = "http://localhost:11434/api/generate"
//! model = "llama3.1:8b"
//! ```
//!
//! Environment variables are applied on top of the file:
//! `CASELENS_DATA_DIR`, `CASELENS_EMBED_MODEL`, `CASELENS_TOP_K`, `CASELENS_LLM_MODEL`.

use crate::cases::CaseSchema;
use crate::error::{Result, RetrieverError};
use crate::storage::ArtifactPaths;
use caselens_context::WordChunker;
use caselens_embed::EmbedConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "caselens.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the three persisted artifacts
    pub data_dir: PathBuf,
    /// Directory of PDF/text documents (`kind = "documents"`)
    pub corpus_dir: PathBuf,
    /// JSON Lines file of case rows (`kind = "cases"`)
    pub cases_file: PathBuf,
    pub index_file: String,
    pub metadata_file: String,
    pub registry_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            corpus_dir: PathBuf::from("data/docs"),
            cases_file: PathBuf::from("data/cases.jsonl"),
            index_file: "vector_index.bin".to_string(),
            metadata_file: "metadata.json".to_string(),
            registry_file: "index_registry.json".to_string(),
        }
    }
}

/// What the corpus is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorpusKind {
    #[default]
    Documents,
    Cases,
}

impl std::fmt::Display for CorpusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorpusKind::Documents => write!(f, "documents"),
            CorpusKind::Cases => write!(f, "cases"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorpusConfig {
    pub kind: CorpusKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per chunk
    pub chunk_size: usize,
    /// Chunks must hold strictly more words than this to be kept
    pub min_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: caselens_context::DEFAULT_CHUNK_SIZE,
            min_words: caselens_context::DEFAULT_MIN_WORDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results returned by a plain search
    pub top_k: usize,
    /// Passages handed to the generator
    pub context_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            context_top_k: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "llama3.1:8b".to_string(),
            timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CaselensConfig {
    pub paths: PathsConfig,
    pub corpus: CorpusConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbedConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub schema: CaseSchema,
}

impl CaselensConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] when `None`.
    ///
    /// A missing file yields the defaults. Environment overrides are applied
    /// afterwards in both cases.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let raw = std::fs::read_to_string(path)?;
            Self::from_toml_str(&raw)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| RetrieverError::configuration(format!("cannot render config: {e}")))
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("CASELENS_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(dir);
        }
        if let Some(model) = lookup("CASELENS_EMBED_MODEL") {
            self.embedding.model_name = model;
        }
        if let Some(top_k) = lookup("CASELENS_TOP_K") {
            self.retrieval.top_k = top_k.trim().parse().map_err(|_| {
                RetrieverError::configuration(format!("CASELENS_TOP_K is not a number: '{top_k}'"))
            })?;
        }
        if let Some(model) = lookup("CASELENS_LLM_MODEL") {
            self.generation.model = model;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(RetrieverError::configuration(
                "chunking.chunk_size must be positive",
            ));
        }
        self.embedding
            .validate()
            .map_err(|e| RetrieverError::configuration(e.to_string()))?;
        Ok(())
    }

    /// Locations of the persisted artifacts under `data_dir`.
    pub fn artifact_paths(&self) -> ArtifactPaths {
        let dir = &self.paths.data_dir;
        ArtifactPaths {
            index: dir.join(&self.paths.index_file),
            metadata: dir.join(&self.paths.metadata_file),
            registry: dir.join(&self.paths.registry_file),
        }
    }

    pub fn word_chunker(&self) -> WordChunker {
        WordChunker::new(self.chunking.chunk_size, self.chunking.min_words)
    }

    /// Set the data directory (builder style)
    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.paths.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the document directory (builder style)
    pub fn with_corpus_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.paths.corpus_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Switch to a case-row corpus read from `file` (builder style)
    pub fn with_cases_file<P: AsRef<Path>>(mut self, file: P) -> Self {
        self.paths.cases_file = file.as_ref().to_path_buf();
        self.corpus.kind = CorpusKind::Cases;
        self
    }

    /// Set the embedding configuration (builder style)
    pub fn with_embedding(mut self, embedding: EmbedConfig) -> Self {
        self.embedding = embedding;
        self
    }

    /// Set chunk size and noise threshold in words (builder style)
    pub fn with_chunking(mut self, chunk_size: usize, min_words: usize) -> Self {
        self.chunking = ChunkingConfig {
            chunk_size,
            min_words,
        };
        self
    }
}
