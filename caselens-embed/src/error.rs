//! Error types for the embedding system

/// Boxed source error carried by the backend variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Any of these reaching the indexer or the retriever means the embedding backend
/// is unavailable for that unit of work. Nothing in this crate retries.
///
/// # Error Categories
///
/// - **Configuration Errors**: unknown model names, bad dimensions
/// - **Initialization Errors**: failures while loading the model
/// - **Runtime Errors**: problems during embedding generation
/// - **IO Errors**: model cache access issues
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when model configuration is invalid
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    /// Error during model initialization
    #[error("Model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: BoxError,
    },

    /// Error during embedding generation
    #[error("Embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: BoxError,
    },

    /// IO errors when reading model files
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Async task join errors
    #[error("Async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl EmbedError {
    /// Wrap an error raised while loading a model.
    ///
    /// Accepts anything convertible to a boxed error: `std` errors,
    /// `anyhow::Error` from the backend, or a plain message.
    pub fn model_init<E: Into<BoxError>>(source: E) -> Self {
        Self::ModelInitialization {
            source: source.into(),
        }
    }

    /// Wrap an error raised while generating embeddings.
    pub fn embedding_gen<E: Into<BoxError>>(source: E) -> Self {
        Self::EmbeddingGeneration {
            source: source.into(),
        }
    }

    /// Create an invalid configuration error with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
