//! Error types for ingestion, indexing and retrieval

use crate::index::ChunkId;
use std::path::PathBuf;
use syllabus_rag_context::ChunkingError;
use syllabus_rag_embed::EmbedError;

/// Result type for retriever operations.
pub type Result<T> = std::result::Result<T, RetrieverError>;

/// Error type for everything between a source document and a ranked result.
///
/// Missing and corrupt artifacts are distinct so callers can tell "never
/// built" apart from "built but damaged". Embedding backend failures are
/// carried unchanged in [`RetrieverError::Embedding`].
#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// Invalid chunk window, unit pattern or configuration file
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Nothing to index: no chunks, or only empty chunk texts
    #[error("No non-empty chunks to index")]
    EmptyInput,

    /// Two chunks handed to a build share an id
    #[error("Duplicate chunk id {chunk_id}")]
    DuplicateChunkId { chunk_id: ChunkId },

    /// Search or save before any successful build or load
    #[error("Index has not been built or loaded")]
    IndexNotBuilt,

    /// A persisted index file does not exist
    #[error("Index artifact not found: {}", .path.display())]
    MissingArtifact { path: PathBuf },

    /// A persisted index file exists but cannot be decoded or is inconsistent
    #[error("Corrupt index artifact {}: {message}", .path.display())]
    CorruptArtifact { path: PathBuf, message: String },

    /// Persisted vectors do not match the current embedder
    #[error("Embedding model mismatch: index expects {expected}, embedder provides {found}")]
    ModelMismatch { expected: String, found: String },

    /// The embedder returned vectors of an unexpected count or width
    #[error("Embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: String, found: String },

    /// Source document type cannot be ingested
    #[error("Unsupported source file: {}", .path.display())]
    UnsupportedSource { path: PathBuf },

    /// Source document does not exist
    #[error("Source file not found: {}", .path.display())]
    MissingSource { path: PathBuf },

    /// PDF parsing failed
    #[error("Failed to read PDF {}: {message}", .path.display())]
    Pdf { path: PathBuf, message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Failure inside the embedding backend
    #[error(transparent)]
    Embedding(#[from] EmbedError),
}

impl RetrieverError {
    /// Create a configuration error with a custom message.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub(crate) fn corrupt<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::CorruptArtifact {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<ChunkingError> for RetrieverError {
    fn from(err: ChunkingError) -> Self {
        Self::configuration(err.to_string())
    }
}
