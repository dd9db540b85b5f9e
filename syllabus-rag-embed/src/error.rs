//! Error types for the embedding system

/// Result type for embedding operations.
///
/// This is a convenience type alias that uses [`EmbedError`] as the error type.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Error type for all embedding operations.
///
/// Covers configuration problems detected before a model is touched, failures
/// while loading a model, and failures while generating vectors. Callers of
/// the retrieval index see these unchanged; there is no retry at this layer.
///
/// # Error Categories
///
/// - **Configuration Errors**: Invalid settings or an unsupported model name
/// - **Initialization Errors**: Failures during model loading or setup
/// - **Runtime Errors**: Problems during actual embedding generation
/// - **IO Errors**: File system access issues (model cache directory)
/// - **External Errors**: Failures from dependencies
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Error when model configuration is invalid
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    /// The configured model name is not one this crate can load
    #[error("Unknown embedding model: {name}")]
    UnknownModel { name: String },

    /// Error during model initialization
    #[error("Model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error during embedding generation
    #[error("Embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// IO errors when preparing the model cache
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

    /// Generic errors from other libraries
    #[error("External error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    /// Create a model initialization error from any error type, including
    /// the `anyhow::Error`s fastembed returns.
    pub fn model_init<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::ModelInitialization {
            source: source.into(),
        }
    }

    /// Create an embedding generation error from any error type.
    ///
    /// This is a convenience constructor for wrapping errors that occur during
    /// the actual embedding generation process.
    pub fn embedding_gen<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
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
