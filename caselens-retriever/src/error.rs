//! Error types for indexing and retrieval

use caselens_embed::EmbedError;
use std::path::PathBuf;

/// Result type for retriever operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Error type for the indexing and retrieval core.
///
/// # Error Categories
///
/// - **Operation-level**: `Configuration`, `EmbeddingBackend`, and artifact
///   corruption abort the current build or query and reach the caller.
/// - **Unit-level**: `CorpusRead` (one document) and `Generation` (one answer) are
///   normally caught close to where they happen, logged, and turned into a skip or
///   a sentinel. They are public so collaborators can surface them if they choose.
///
/// Nothing in this crate retries.
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// A required artifact or setting is missing
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// One source document could not be read or extracted
    #[error("Failed to read corpus document '{document}': {message}")]
    CorpusRead { document: String, message: String },

    /// The embedding backend failed for this unit of work
    #[error("Embedding backend failed: {source}")]
    EmbeddingBackend {
        #[from]
        source: EmbedError,
    },

    /// Vector index and metadata store disagree
    #[error("Index inconsistency: {message}")]
    IndexInconsistency { message: String },

    /// The generation adapter failed or timed out
    #[error("Generation failed: {message}")]
    Generation { message: String },

    /// A persisted artifact exists but cannot be decoded
    #[error("Invalid artifact {path}: {message}")]
    InvalidArtifact { path: PathBuf, message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Config parse error: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl RetrieverError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn corpus_read<D: Into<String>, S: ToString>(document: D, message: S) -> Self {
        Self::CorpusRead {
            document: document.into(),
            message: message.to_string(),
        }
    }

    pub fn inconsistency<S: Into<String>>(message: S) -> Self {
        Self::IndexInconsistency {
            message: message.into(),
        }
    }

    pub fn generation<S: ToString>(message: S) -> Self {
        Self::Generation {
            message: message.to_string(),
        }
    }

    pub fn invalid_artifact<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::InvalidArtifact {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the on-disk index must be rebuilt before it can serve queries.
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            Self::IndexInconsistency { .. } | Self::InvalidArtifact { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RetrieverError::configuration("index file not found");
        assert_eq!(err.to_string(), "Configuration error: index file not found");

        let err = RetrieverError::corpus_read("doc1.pdf", "no text layer");
        assert_eq!(
            err.to_string(),
            "Failed to read corpus document 'doc1.pdf': no text layer"
        );

        let err: RetrieverError = EmbedError::invalid_config("offline").into();
        assert!(err.to_string().starts_with("Embedding backend failed"));
    }

    #[test]
    fn test_requires_rebuild() {
        assert!(RetrieverError::inconsistency("3 vectors, 2 records").requires_rebuild());
        assert!(RetrieverError::invalid_artifact("x.bin", "bad magic").requires_rebuild());
        assert!(!RetrieverError::configuration("missing").requires_rebuild());
    }
}
